//! Job entity: creation input, interchange record, and runtime handle.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::schedule::{Repeat, Schedule};

/// Input for creating a job.
///
/// The id is generated by the scheduler at registration time; everything else
/// comes from the caller.
#[derive(Debug, Clone, Default)]
pub struct JobSpec {
    /// Human-readable label.
    pub name: String,
    /// Command to run, tokenized on whitespace: first token is the
    /// executable, the rest are arguments. No quoting support.
    /// e.g. "bash /path/to/my/script.sh"
    pub command: String,
    /// Owner of this job, e.g. "admin@example.com".
    pub owner: String,
    /// Raw interval-notation schedule; empty means "run once immediately".
    pub schedule: String,
    /// Number of retries permitted per scheduled occurrence.
    pub retries: u32,
    /// Parent job ids. A job with parents is only ever triggered by a
    /// parent's success, never by its own timer.
    pub parent_jobs: Vec<Uuid>,
}

/// Interchange record for a job, as handed to management layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub name: String,
    pub id: Uuid,
    pub command: String,
    pub owner: String,
    pub disabled: bool,
    pub dependent_jobs: Vec<Uuid>,
    pub parent_jobs: Vec<Uuid>,
    pub schedule: String,
    pub retries: u32,
    pub success_count: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub error_count: u64,
    pub last_error: Option<DateTime<Utc>>,
    pub last_attempted_run: Option<DateTime<Utc>>,
}

/// Lifecycle phase of a job's scheduling slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobPhase {
    /// Waiting for its timer or for a parent to trigger it.
    Scheduled,
    /// An occurrence is currently executing.
    Running,
    /// Finished an occurrence with more to come.
    Rescheduled,
    /// Recurrence exhausted (or one-off finished); will not re-arm.
    Completed,
    /// Disabled by the management layer.
    Disabled,
}

/// Metadata about successful and failed runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunStats {
    pub success_count: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub error_count: u64,
    pub last_error: Option<DateTime<Utc>>,
    pub last_attempted_run: Option<DateTime<Utc>>,
}

/// Mutable per-job fields.
///
/// Every access goes through the handle's mutex; the lock is never held
/// across an await, so `disable` stays non-blocking.
#[derive(Debug)]
pub(crate) struct JobState {
    pub disabled: bool,
    pub phase: JobPhase,
    /// Occurrences remaining after the next fire.
    pub repeat_left: Repeat,
    /// Remaining retry budget; re-seeded from the configured budget only
    /// when exhausted and a new occurrence begins.
    pub current_retries: u32,
    /// Jobs this one triggers on success.
    pub dependent_jobs: Vec<Uuid>,
    /// Jobs this one is triggered by.
    pub parent_jobs: Vec<Uuid>,
    pub stats: RunStats,
}

/// A registered job: immutable definition plus lock-guarded mutable state.
#[derive(Debug)]
pub(crate) struct JobHandle {
    pub id: Uuid,
    pub name: String,
    pub owner: String,
    pub command: String,
    /// The schedule string as supplied at creation.
    pub schedule_raw: String,
    /// Parsed schedule; `None` for one-off and parent-triggered jobs.
    pub schedule: Option<Schedule>,
    /// Configured retry budget per occurrence.
    pub retries: u32,
    /// Cancels the pending wait (disable, shutdown).
    pub cancel: CancellationToken,
    pub state: Mutex<JobState>,
}

impl JobHandle {
    pub(crate) fn new(
        id: Uuid,
        spec: JobSpec,
        schedule: Option<Schedule>,
        cancel: CancellationToken,
    ) -> Self {
        let repeat_left = schedule
            .as_ref()
            .map(|s| s.repeat)
            .unwrap_or(Repeat::Times(0));
        Self {
            id,
            name: spec.name,
            owner: spec.owner,
            command: spec.command,
            schedule_raw: spec.schedule,
            schedule,
            retries: spec.retries,
            cancel,
            state: Mutex::new(JobState {
                disabled: false,
                phase: JobPhase::Scheduled,
                repeat_left,
                current_retries: 0,
                dependent_jobs: Vec::new(),
                parent_jobs: spec.parent_jobs,
                stats: RunStats::default(),
            }),
        }
    }

    /// Point-in-time interchange record for this job.
    pub(crate) fn snapshot(&self) -> JobRecord {
        let st = self.state.lock().unwrap();
        JobRecord {
            name: self.name.clone(),
            id: self.id,
            command: self.command.clone(),
            owner: self.owner.clone(),
            disabled: st.disabled,
            dependent_jobs: st.dependent_jobs.clone(),
            parent_jobs: st.parent_jobs.clone(),
            schedule: self.schedule_raw.clone(),
            retries: self.retries,
            success_count: st.stats.success_count,
            last_success: st.stats.last_success,
            error_count: st.stats.error_count,
            last_error: st.stats.last_error,
            last_attempted_run: st.stats.last_attempted_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(spec: JobSpec) -> JobHandle {
        JobHandle::new(Uuid::new_v4(), spec, None, CancellationToken::new())
    }

    #[test]
    fn test_snapshot_reflects_definition() {
        let job = handle(JobSpec {
            name: "nightly-backup".into(),
            command: "bash /opt/backup.sh".into(),
            owner: "admin@example.com".into(),
            schedule: "R/2999-01-01T00:00:00Z/P1D".into(),
            retries: 3,
            parent_jobs: Vec::new(),
        });

        let rec = job.snapshot();
        assert_eq!(rec.id, job.id);
        assert_eq!(rec.name, "nightly-backup");
        assert_eq!(rec.command, "bash /opt/backup.sh");
        assert_eq!(rec.owner, "admin@example.com");
        assert_eq!(rec.schedule, "R/2999-01-01T00:00:00Z/P1D");
        assert_eq!(rec.retries, 3);
        assert!(!rec.disabled);
        assert_eq!(rec.success_count, 0);
        assert!(rec.last_success.is_none());
        assert!(rec.last_attempted_run.is_none());
    }

    #[test]
    fn test_record_serde_round_trip() {
        let job = handle(JobSpec {
            name: "roundtrip".into(),
            command: "echo hi".into(),
            schedule: "R5/2999-01-01T00:00:00Z/PT2H".into(),
            retries: 2,
            ..Default::default()
        });

        let rec = job.snapshot();
        let json = serde_json::to_string(&rec).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.id, rec.id);
        assert_eq!(back.name, "roundtrip");
        assert_eq!(back.command, "echo hi");
        assert_eq!(back.schedule, "R5/2999-01-01T00:00:00Z/PT2H");
        assert_eq!(back.retries, 2);
    }

    #[test]
    fn test_record_field_names() {
        let rec = handle(JobSpec::default()).snapshot();
        let value = serde_json::to_value(&rec).unwrap();
        let obj = value.as_object().unwrap();
        for field in [
            "name",
            "id",
            "command",
            "owner",
            "disabled",
            "dependent_jobs",
            "parent_jobs",
            "schedule",
            "retries",
            "success_count",
            "last_success",
            "error_count",
            "last_error",
            "last_attempted_run",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        assert_eq!(obj.len(), 14);
    }
}
