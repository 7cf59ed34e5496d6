//! Scheduler service: job creation, timer arming, disable, shutdown.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::spawn_occurrence;
use crate::job::{JobHandle, JobPhase, JobRecord, JobSpec};
use crate::registry::Registry;
use crate::schedule::{Repeat, Schedule};

/// Shared engine state: the registry, configuration, and the scheduler-wide
/// shutdown token that every per-job token is a child of.
pub(crate) struct SchedulerCore {
    pub(crate) registry: Registry,
    pub(crate) config: SchedulerConfig,
    pub(crate) shutdown: CancellationToken,
}

/// The scheduling engine.
///
/// Jobs are registered with [`Scheduler::add_job`]; each scheduled job gets
/// its own timer task that fires occurrences at the right wall-clock time.
/// Clones share the same engine.
///
/// Creation and management methods must be called from within a Tokio
/// runtime, since firing spawns tasks.
#[derive(Clone)]
pub struct Scheduler {
    core: Arc<SchedulerCore>,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            core: Arc::new(SchedulerCore {
                registry: Registry::new(),
                config,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Register a new job and start it according to its definition.
    ///
    /// - With parents: the job is linked into each parent's dependent list
    ///   and waits to be triggered; its own schedule string is ignored.
    /// - With an empty schedule: the job runs once immediately, without
    ///   blocking the caller.
    /// - Otherwise: the schedule is parsed and a timer is armed for the
    ///   anchor instant.
    ///
    /// Any schedule-parse or parent-resolution error is returned and the job
    /// is left unregistered.
    pub fn add_job(&self, spec: JobSpec) -> Result<Uuid, SchedulerError> {
        if self.core.shutdown.is_cancelled() {
            return Err(SchedulerError::ShuttingDown);
        }
        let id = Uuid::new_v4();

        if !spec.parent_jobs.is_empty() {
            // All parents must resolve before any edge is added, so a bad
            // parent list leaves the graph untouched.
            self.core.registry.resolve_parents(&spec.parent_jobs)?;
            if !spec.schedule.is_empty() {
                debug!(job = %spec.name, "job has parents; its own schedule is ignored");
            }
            let parent_ids = spec.parent_jobs.clone();
            let job = Arc::new(JobHandle::new(
                id,
                spec,
                None,
                self.core.shutdown.child_token(),
            ));
            self.core.registry.insert(job.clone());
            for parent in &parent_ids {
                self.core.registry.link_dependent(*parent, id)?;
            }
            info!(job = %job.name, %id, parents = parent_ids.len(), "registered dependent job");
            return Ok(id);
        }

        if spec.schedule.is_empty() {
            let job = Arc::new(JobHandle::new(
                id,
                spec,
                None,
                self.core.shutdown.child_token(),
            ));
            self.core.registry.insert(job.clone());
            info!(job = %job.name, %id, "running one-off job");
            spawn_occurrence(self.core.clone(), job, JobPhase::Completed);
            return Ok(id);
        }

        let schedule = Schedule::parse(&spec.schedule)?;
        debug!(
            job = %spec.name,
            repeat = ?schedule.repeat,
            anchor = %schedule.anchor,
            "parsed schedule"
        );
        let job = Arc::new(JobHandle::new(
            id,
            spec,
            Some(schedule),
            self.core.shutdown.child_token(),
        ));
        self.core.registry.insert(job.clone());
        tokio::spawn(timer_loop(self.core.clone(), job));
        Ok(id)
    }

    /// Disable a job: cancel its pending wait and mark it disabled.
    ///
    /// Idempotent and non-blocking. An occurrence that is already executing
    /// (including its retry chain) is not interrupted, but no further
    /// occurrence will run.
    pub fn disable(&self, id: Uuid) -> Result<(), SchedulerError> {
        let job = self
            .core
            .registry
            .get(&id)
            .ok_or(SchedulerError::JobNotFound { id })?;
        job.cancel.cancel();
        let mut st = job.state.lock().unwrap();
        st.disabled = true;
        st.phase = JobPhase::Disabled;
        info!(job = %job.name, %id, "job disabled");
        Ok(())
    }

    /// Link an existing job as a dependent of another, so that `dependent`
    /// runs after each of `parent`'s successes.
    ///
    /// Fails with `CyclicDependency` when the edge would close a cycle.
    pub fn link(&self, parent: Uuid, dependent: Uuid) -> Result<(), SchedulerError> {
        self.core
            .registry
            .get(&dependent)
            .ok_or(SchedulerError::JobNotFound { id: dependent })?;
        self.core.registry.link_dependent(parent, dependent)
    }

    /// Point-in-time record of one job, if registered.
    pub fn job(&self, id: Uuid) -> Option<JobRecord> {
        self.core.registry.get(&id).map(|job| job.snapshot())
    }

    /// Point-in-time records of every registered job.
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.core
            .registry
            .all()
            .iter()
            .map(|job| job.snapshot())
            .collect()
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.core.registry.len()
    }

    /// Shut down the scheduler: cancel every pending wait, then give
    /// in-flight runs the configured grace period to finish.
    ///
    /// After shutdown, `add_job` fails with `ShuttingDown`.
    pub async fn shutdown(&self) {
        info!("scheduler shutting down");
        self.core.shutdown.cancel();
        let grace = self.core.config.shutdown_timeout_secs;
        if grace > 0 {
            sleep(std::time::Duration::from_secs(grace)).await;
        }
        info!("scheduler shutdown complete");
    }
}

/// Per-job timer task.
///
/// Owns the job's pending wait: arms for the anchor first, then re-arms one
/// step from "now" after each fire (never from the previous anchor, so
/// calendar-variable steps and drift are tolerated). Ends when the schedule
/// is exhausted or the job's token is cancelled.
async fn timer_loop(core: Arc<SchedulerCore>, job: Arc<JobHandle>) {
    let Some(schedule) = job.schedule.clone() else {
        return;
    };
    let mut next = schedule.anchor;

    loop {
        let now = Utc::now();
        // An anchor already in the past counts as consumed; wait one step
        // from now instead.
        if next <= now {
            next = schedule.step.after(now);
        }
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(job = %job.name, wait_secs = wait.as_secs_f64(), "job scheduled to run");

        tokio::select! {
            _ = job.cancel.cancelled() => {
                debug!(job = %job.name, "pending wait cancelled");
                return;
            }
            _ = sleep(wait) => {}
        }

        let more = {
            let mut st = job.state.lock().unwrap();
            if st.disabled {
                return;
            }
            match st.repeat_left {
                Repeat::Forever => true,
                Repeat::Times(0) => false,
                Repeat::Times(ref mut n) => {
                    *n -= 1;
                    true
                }
            }
        };
        let after = if more {
            JobPhase::Rescheduled
        } else {
            JobPhase::Completed
        };
        // The occurrence runs on its own task; a slow command must not delay
        // the next arm.
        spawn_occurrence(core.clone(), job.clone(), after);

        if !more {
            debug!(job = %job.name, "schedule exhausted");
            return;
        }
        next = schedule.step.after(Utc::now());
    }
}
