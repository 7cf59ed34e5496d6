//! Command execution, retry control, and dependent fan-out.
//!
//! A firing never reports its outcome to a caller: failures land in the job
//! statistics and the log, successes additionally trigger dependent jobs.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::job::{JobHandle, JobPhase};
use crate::scheduler::SchedulerCore;

/// Failure of a single command attempt.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command string contains no tokens.
    #[error("command is empty")]
    Empty,

    /// The process could not be launched or awaited.
    #[error("failed to run command: {0}")]
    Io(#[from] std::io::Error),

    /// The process ran but exited unsuccessfully.
    #[error("command exited with {0}")]
    NonZeroExit(ExitStatus),

    /// The process exceeded the configured execution bound and was killed.
    #[error("command timed out after {0}s")]
    Timeout(u64),
}

/// Run the command once and wait for it to finish.
///
/// The command is tokenized on whitespace: the first token is the executable,
/// the rest are arguments. There is no quoting or escaping support.
/// `timeout_secs == 0` leaves execution unbounded.
pub(crate) async fn run_command(command: &str, timeout_secs: u64) -> Result<(), CommandError> {
    let mut tokens = command.split_whitespace();
    let program = tokens.next().ok_or(CommandError::Empty)?;
    let mut child = Command::new(program).args(tokens).spawn()?;

    let status = if timeout_secs == 0 {
        child.wait().await?
    } else {
        match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(err) = child.kill().await {
                    warn!(%err, "failed to kill timed-out command");
                }
                return Err(CommandError::Timeout(timeout_secs));
            }
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(CommandError::NonZeroExit(status))
    }
}

/// Start one occurrence of `job` on its own task.
///
/// `after` is the phase the job returns to once the occurrence finishes,
/// unless it was disabled in the meantime.
pub(crate) fn spawn_occurrence(core: Arc<SchedulerCore>, job: Arc<JobHandle>, after: JobPhase) {
    tokio::spawn(async move { run_occurrence(&core, &job, after).await });
}

/// Execute one occurrence: seed the retry budget, run the command with
/// bounded retries, update statistics, and trigger dependents on success.
async fn run_occurrence(core: &Arc<SchedulerCore>, job: &Arc<JobHandle>, after: JobPhase) {
    {
        let mut st = job.state.lock().unwrap();
        // A disable that raced the fire wins: checked under the same lock
        // that `disable` takes.
        if st.disabled {
            debug!(job = %job.name, "skipping run of disabled job");
            return;
        }
        st.phase = JobPhase::Running;
        if st.current_retries == 0 && job.retries != 0 {
            st.current_retries = job.retries;
        }
    }
    info!(job = %job.name, id = %job.id, "job running");

    let succeeded = loop {
        job.state.lock().unwrap().stats.last_attempted_run = Some(Utc::now());

        match run_command(&job.command, core.config.command_timeout_secs).await {
            Ok(()) => break true,
            Err(err) => {
                error!(job = %job.name, %err, "job run failed");
                let retries_left = {
                    let mut st = job.state.lock().unwrap();
                    st.stats.last_error = Some(Utc::now());
                    if st.current_retries > 0 {
                        st.current_retries -= 1;
                        Some(st.current_retries)
                    } else {
                        // The whole occurrence failed; one tick on the
                        // counter regardless of how many attempts it took.
                        st.stats.error_count += 1;
                        None
                    }
                };
                match retries_left {
                    Some(left) => debug!(job = %job.name, retries_left = left, "retrying"),
                    None => break false,
                }
            }
        }
    };

    if succeeded {
        let dependents = {
            let mut st = job.state.lock().unwrap();
            st.stats.success_count += 1;
            st.stats.last_success = Some(Utc::now());
            st.dependent_jobs.clone()
        };
        info!(job = %job.name, "job run succeeded");

        // Dependents fire concurrently and fire-and-forget: no ordering
        // between siblings, no outcome reported back.
        for id in dependents {
            match core.registry.get(&id) {
                Some(dep) => spawn_occurrence(core.clone(), dep, JobPhase::Scheduled),
                None => warn!(job = %job.name, dependent = %id, "dependent job missing from registry"),
            }
        }
    } else {
        debug!(job = %job.name, "retry budget exhausted for this occurrence");
    }

    let mut st = job.state.lock().unwrap();
    if !st.disabled {
        st.phase = after;
    }
    debug!(job = %job.name, phase = ?st.phase, "occurrence finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_success() {
        run_command("true", 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_command_with_arguments() {
        run_command("echo hello world", 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_command_nonzero_exit() {
        let err = run_command("false", 0).await.unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit(_)));
    }

    #[tokio::test]
    async fn test_run_command_empty() {
        let err = run_command("", 0).await.unwrap_err();
        assert!(matches!(err, CommandError::Empty));

        let err = run_command("   ", 0).await.unwrap_err();
        assert!(matches!(err, CommandError::Empty));
    }

    #[tokio::test]
    async fn test_run_command_launch_failure() {
        let err = run_command("/no/such/binary-here", 0).await.unwrap_err();
        assert!(matches!(err, CommandError::Io(_)));
    }

    #[tokio::test]
    async fn test_run_command_timeout() {
        let err = run_command("sleep 5", 1).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout(1)));
    }
}
