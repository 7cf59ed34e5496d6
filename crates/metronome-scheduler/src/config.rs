//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the scheduler service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound in seconds for a single command attempt; 0 disables the
    /// bound. An attempt that exceeds it is killed and counted as a failure.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Grace period in seconds that `shutdown` gives in-flight runs before
    /// returning.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    0
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}
