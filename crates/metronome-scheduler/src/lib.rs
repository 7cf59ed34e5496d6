//! Interval-notation job scheduling and execution for the metronome daemon.
//!
//! Jobs are defined by a command string and an interval-notation schedule
//! (`R[n]/<start>/<duration>`, e.g. `R5/2014-03-08T20:00:00Z/P1D`). Each
//! scheduled job gets its own timer task; every firing runs the command on
//! its own task, applies the per-occurrence retry budget, records run
//! statistics, and triggers dependent jobs on success.
//!
//! # Features
//!
//! - Interval-notation schedules with calendar-variable step durations,
//!   re-resolved against "now" at every re-arm
//! - One-off jobs (empty schedule) executed immediately
//! - Dependent jobs triggered by a parent's success instead of a timer,
//!   with the dependency graph kept acyclic
//! - Bounded per-occurrence retries with strict budget decrement
//! - Idempotent disable that also stops a concurrently firing wait
//! - Graceful shutdown cancelling every pending wait
//!
//! # Example
//!
//! ```ignore
//! use metronome_scheduler::{JobSpec, Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default());
//! let id = scheduler.add_job(JobSpec {
//!     name: "nightly-report".into(),
//!     command: "bash /opt/report.sh".into(),
//!     schedule: "R/2030-01-01T04:00:00Z/P1D".into(),
//!     retries: 2,
//!     ..Default::default()
//! })?;
//!
//! // Later:
//! let record = scheduler.job(id);
//! scheduler.disable(id)?;
//! scheduler.shutdown().await;
//! ```

mod config;
mod error;
mod executor;
mod job;
mod registry;
mod schedule;
mod scheduler;

pub use config::SchedulerConfig;
pub use error::{ScheduleError, SchedulerError};
pub use executor::CommandError;
pub use job::{JobRecord, JobSpec};
pub use schedule::{Repeat, Schedule, StepDuration};
pub use scheduler::Scheduler;
