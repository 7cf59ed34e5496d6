//! Layered configuration for the metronome daemon.
//!
//! Settings are loaded in order (later sources override earlier): built-in
//! defaults, the config file, `METRONOME_*` environment variables. CLI flags
//! are applied on top by the command layer.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use metronome_scheduler::SchedulerConfig;

/// One job definition from the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,

    /// Command to run, whitespace-tokenized.
    pub command: String,

    #[serde(default)]
    pub owner: String,

    /// Interval-notation schedule; empty runs the job once at startup.
    #[serde(default)]
    pub schedule: String,

    /// Retry budget per occurrence.
    #[serde(default)]
    pub retries: u32,

    /// Names of jobs this one depends on. A job with dependencies is only
    /// triggered by their success; the names must be defined earlier in the
    /// file.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Default log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            scheduler: SchedulerConfig::default(),
            jobs: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, the given config file, and environment
    /// variables (`METRONOME_LOG_LEVEL`,
    /// `METRONOME_SCHEDULER__COMMAND_TIMEOUT_SECS`, ...).
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = Config::builder().set_default("log_level", default_log_level())?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("METRONOME")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.scheduler.command_timeout_secs, 0);
        assert!(settings.jobs.is_empty());
    }

    #[test]
    fn test_job_definition_defaults() {
        let def: JobDefinition = toml_from_str(
            r#"
            name = "minimal"
            command = "true"
            "#,
        );
        assert_eq!(def.name, "minimal");
        assert_eq!(def.owner, "");
        assert_eq!(def.schedule, "");
        assert_eq!(def.retries, 0);
        assert!(def.depends_on.is_empty());
    }

    fn toml_from_str(s: &str) -> JobDefinition {
        Config::builder()
            .add_source(config::File::from_str(s, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
