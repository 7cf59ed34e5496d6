//! Error types for the scheduler crate.
//!
//! Schedule parsing and job creation report structured errors to the caller;
//! command execution failures are deliberately *not* represented here because
//! they never propagate out of a firing (they land in the job statistics and
//! the log, see `executor`).

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while parsing an interval-notation schedule string.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The string does not split into repeat/start/duration segments.
    #[error("schedule not formatted correctly, expected R[n]/<start>/<duration>: {0:?}")]
    MalformedSchedule(String),

    /// The repeat segment is not `R` or `R<digits>`.
    #[error("invalid repeat count: {0:?}")]
    RepeatCount(String),

    /// The start segment is not a valid RFC 3339 timestamp.
    #[error("invalid start timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// The start instant is not strictly in the future.
    #[error("schedule start time has already passed: {0}")]
    PastSchedule(DateTime<Utc>),

    /// The duration segment is not a usable ISO 8601 duration.
    #[error("invalid duration: {0}")]
    Duration(String),
}

/// Errors returned from job creation and management operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The job's schedule string failed to parse.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A declared parent id is not registered.
    #[error("parent job not found: {id}")]
    UnresolvedParent { id: Uuid },

    /// Linking would make the dependency graph cyclic.
    #[error("dependency link would create a cycle through job {id}")]
    CyclicDependency { id: Uuid },

    /// No job with the given id exists in the registry.
    #[error("job not found: {id}")]
    JobNotFound { id: Uuid },

    /// The scheduler has been shut down and accepts no new jobs.
    #[error("scheduler is shutting down")]
    ShuttingDown,
}
