//! Interval-notation schedule parsing.
//!
//! A schedule string has three `/`-separated segments: a repeat spec, an
//! RFC 3339 start instant, and an ISO 8601 duration, e.g.
//! `R/2014-03-08T20:00:00Z/PT2H` (repeat forever, every two hours) or
//! `R5/2014-03-08T20:00:00Z/P1D` (five further daily occurrences).
//!
//! The duration is kept in structured form rather than collapsed to a fixed
//! number of seconds: month and year components are calendar-variable, so the
//! concrete wait is recomputed against "now" every time a job re-arms.

use chrono::{DateTime, Duration, Months, Utc};

use crate::error::ScheduleError;

/// How many occurrences remain after the first run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Repeat without bound (`R`).
    Forever,
    /// Repeat this many more times after the first run (`R<n>`).
    Times(u64),
}

impl Repeat {
    fn parse(spec: &str) -> Result<Self, ScheduleError> {
        let rest = spec
            .strip_prefix('R')
            .ok_or_else(|| ScheduleError::RepeatCount(spec.to_string()))?;
        if rest.is_empty() {
            return Ok(Repeat::Forever);
        }
        rest.parse()
            .map(Repeat::Times)
            .map_err(|_| ScheduleError::RepeatCount(spec.to_string()))
    }
}

/// An ISO 8601 duration, `P[nY][nM][nW][nD][T[nH][nM][nS]]`.
///
/// Stored per-component so that [`StepDuration::after`] can resolve the
/// calendar-variable parts (years, months) relative to a concrete instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepDuration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl StepDuration {
    /// Parse an ISO 8601 duration string.
    ///
    /// Zero-length durations are rejected: a job stepping by `PT0S` would
    /// re-arm in a hot loop.
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        let body = s
            .strip_prefix('P')
            .ok_or_else(|| ScheduleError::Duration(format!("{s:?} does not start with 'P'")))?;

        let mut out = StepDuration::default();
        let mut in_time = false;
        let mut digits = String::new();
        let mut saw_component = false;
        let mut saw_time_component = false;

        for ch in body.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            if ch == 'T' && !in_time && digits.is_empty() {
                in_time = true;
                continue;
            }
            if digits.is_empty() {
                return Err(ScheduleError::Duration(format!(
                    "missing value before {ch:?} in {s:?}"
                )));
            }
            let value: u32 = digits.parse().map_err(|_| {
                ScheduleError::Duration(format!("value {digits:?} out of range in {s:?}"))
            })?;
            digits.clear();

            let field = match (in_time, ch) {
                (false, 'Y') => &mut out.years,
                (false, 'M') => &mut out.months,
                (false, 'W') => &mut out.weeks,
                (false, 'D') => &mut out.days,
                (true, 'H') => &mut out.hours,
                (true, 'M') => &mut out.minutes,
                (true, 'S') => &mut out.seconds,
                _ => {
                    return Err(ScheduleError::Duration(format!(
                        "unexpected designator {ch:?} in {s:?}"
                    )))
                }
            };
            *field = value;
            saw_component = true;
            saw_time_component |= in_time;
        }

        if !digits.is_empty() {
            return Err(ScheduleError::Duration(format!(
                "trailing digits {digits:?} in {s:?}"
            )));
        }
        if !saw_component {
            return Err(ScheduleError::Duration(format!("no components in {s:?}")));
        }
        if in_time && !saw_time_component {
            return Err(ScheduleError::Duration(format!(
                "no components after 'T' in {s:?}"
            )));
        }
        if out.is_zero() {
            return Err(ScheduleError::Duration(format!(
                "zero-length duration {s:?}"
            )));
        }
        Ok(out)
    }

    /// True when every component is zero.
    pub fn is_zero(&self) -> bool {
        *self == StepDuration::default()
    }

    /// Resolve this duration against `from`.
    ///
    /// Year/month components use calendar arithmetic (chrono clamps the day
    /// when the target month is shorter, e.g. Jan 31 + P1M = Feb 28); the
    /// remaining components are fixed-length.
    pub fn after(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let months = self.years * 12 + self.months;
        let mut at = from;
        if months > 0 {
            at = at + Months::new(months);
        }
        at + Duration::weeks(i64::from(self.weeks))
            + Duration::days(i64::from(self.days))
            + Duration::hours(i64::from(self.hours))
            + Duration::minutes(i64::from(self.minutes))
            + Duration::seconds(i64::from(self.seconds))
    }
}

/// A parsed schedule: repeat count, first fire instant, and step duration.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub repeat: Repeat,
    pub anchor: DateTime<Utc>,
    pub step: StepDuration,
}

impl Schedule {
    /// Parse a raw schedule string.
    ///
    /// The anchor must be strictly in the future; schedules that start in the
    /// past fail with [`ScheduleError::PastSchedule`].
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        Self::parse_at(raw, Utc::now())
    }

    pub(crate) fn parse_at(raw: &str, now: DateTime<Utc>) -> Result<Self, ScheduleError> {
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() != 3 {
            return Err(ScheduleError::MalformedSchedule(raw.to_string()));
        }

        let repeat = Repeat::parse(parts[0])?;
        let anchor = DateTime::parse_from_rfc3339(parts[1])?.with_timezone(&Utc);
        if anchor <= now {
            return Err(ScheduleError::PastSchedule(anchor));
        }
        let step = StepDuration::parse(parts[2])?;

        Ok(Self {
            repeat,
            anchor,
            step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn before_2014() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_infinite_two_hour_schedule() {
        let sched = Schedule::parse_at("R/2014-03-08T20:00:00Z/PT2H", before_2014()).unwrap();
        assert_eq!(sched.repeat, Repeat::Forever);
        assert_eq!(
            sched.anchor,
            Utc.with_ymd_and_hms(2014, 3, 8, 20, 0, 0).unwrap()
        );
        assert_eq!(
            sched.step,
            StepDuration {
                hours: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_parse_bounded_daily_schedule() {
        let sched = Schedule::parse_at("R2/2014-03-08T20:00:00Z/P1D", before_2014()).unwrap();
        assert_eq!(sched.repeat, Repeat::Times(2));
        assert_eq!(sched.step.days, 1);
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        let err = Schedule::parse_at("R/2014-03-08T20:00:00Z", before_2014()).unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedSchedule(_)));

        let err =
            Schedule::parse_at("R/2014-03-08T20:00:00Z/PT2H/extra", before_2014()).unwrap_err();
        assert!(matches!(err, ScheduleError::MalformedSchedule(_)));
    }

    #[test]
    fn test_parse_rejects_past_anchor() {
        let err = Schedule::parse("R/2014-03-08T20:00:00Z/PT2H").unwrap_err();
        assert!(matches!(err, ScheduleError::PastSchedule(_)));
    }

    #[test]
    fn test_parse_rejects_bad_repeat() {
        for spec in ["Rx/2999-01-01T00:00:00Z/P1D", "5/2999-01-01T00:00:00Z/P1D"] {
            let err = Schedule::parse_at(spec, before_2014()).unwrap_err();
            assert!(matches!(err, ScheduleError::RepeatCount(_)), "{spec}");
        }
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        let err = Schedule::parse_at("R/not-a-time/P1D", before_2014()).unwrap_err();
        assert!(matches!(err, ScheduleError::Timestamp(_)));
    }

    #[test]
    fn test_duration_parse_full_form() {
        let d = StepDuration::parse("P1Y2M3W4DT5H6M7S").unwrap();
        assert_eq!(
            d,
            StepDuration {
                years: 1,
                months: 2,
                weeks: 3,
                days: 4,
                hours: 5,
                minutes: 6,
                seconds: 7,
            }
        );
    }

    #[test]
    fn test_duration_parse_month_vs_minute() {
        let d = StepDuration::parse("P1M").unwrap();
        assert_eq!(d.months, 1);
        assert_eq!(d.minutes, 0);

        let d = StepDuration::parse("PT1M").unwrap();
        assert_eq!(d.minutes, 1);
        assert_eq!(d.months, 0);
    }

    #[test]
    fn test_duration_parse_rejects_junk() {
        for s in ["", "1D", "P", "PT", "P1X", "PT5", "PD", "P1DT", "PT0S"] {
            assert!(
                matches!(StepDuration::parse(s), Err(ScheduleError::Duration(_))),
                "{s:?} should not parse"
            );
        }
    }

    #[test]
    fn test_duration_after_fixed_components() {
        let from = Utc.with_ymd_and_hms(2014, 3, 8, 20, 0, 0).unwrap();
        let d = StepDuration::parse("PT2H").unwrap();
        assert_eq!(
            d.after(from),
            Utc.with_ymd_and_hms(2014, 3, 8, 22, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_duration_after_clamps_short_months() {
        let from = Utc.with_ymd_and_hms(2014, 1, 31, 12, 0, 0).unwrap();
        let d = StepDuration::parse("P1M").unwrap();
        assert_eq!(
            d.after(from),
            Utc.with_ymd_and_hms(2014, 2, 28, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_duration_after_combines_calendar_and_fixed() {
        let from = Utc.with_ymd_and_hms(2014, 1, 15, 0, 0, 0).unwrap();
        let d = StepDuration::parse("P1M2DT3H").unwrap();
        assert_eq!(
            d.after(from),
            Utc.with_ymd_and_hms(2014, 2, 17, 3, 0, 0).unwrap()
        );
    }
}
