//! Command implementations (run, check).

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::info;
use uuid::Uuid;

use metronome_scheduler::{JobSpec, Schedule, Scheduler};

use crate::settings::{JobDefinition, Settings};

/// Run the scheduler in the foreground until SIGINT/SIGTERM.
///
/// 1. Load configuration (defaults -> file -> env -> CLI)
/// 2. Initialize logging
/// 3. Register configured jobs
/// 4. Wait for a shutdown signal, then drain gracefully
pub async fn run(config_path: Option<&str>, log_level_override: Option<&str>) -> Result<()> {
    let mut settings = Settings::load(config_path).context("failed to load configuration")?;
    if let Some(level) = log_level_override {
        settings.log_level = level.to_string();
    }

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("metronome daemon starting");
    info!("  log level: {}", settings.log_level);
    info!("  configured jobs: {}", settings.jobs.len());

    let scheduler = Scheduler::new(settings.scheduler.clone());
    register_jobs(&scheduler, &settings.jobs).context("failed to register configured jobs")?;

    shutdown_signal().await;
    scheduler.shutdown().await;
    Ok(())
}

/// Register config-file job definitions in order, resolving `depends_on`
/// names against jobs defined earlier in the file.
pub fn register_jobs(scheduler: &Scheduler, jobs: &[JobDefinition]) -> Result<()> {
    let mut ids: HashMap<&str, Uuid> = HashMap::new();
    for def in jobs {
        if ids.contains_key(def.name.as_str()) {
            bail!("duplicate job name in config: {:?}", def.name);
        }
        let mut parents = Vec::new();
        for parent_name in &def.depends_on {
            match ids.get(parent_name.as_str()) {
                Some(id) => parents.push(*id),
                None => bail!(
                    "job {:?} depends on unknown job {:?} (dependencies must be defined earlier in the file)",
                    def.name,
                    parent_name
                ),
            }
        }
        let id = scheduler
            .add_job(JobSpec {
                name: def.name.clone(),
                command: def.command.clone(),
                owner: def.owner.clone(),
                schedule: def.schedule.clone(),
                retries: def.retries,
                parent_jobs: parents,
            })
            .with_context(|| format!("failed to register job {:?}", def.name))?;
        ids.insert(def.name.as_str(), id);
        info!(job = %def.name, %id, "registered job");
    }
    Ok(())
}

/// Validate the config file without running anything: job names must be
/// unique, dependencies must resolve to earlier jobs, and every schedule
/// that would be armed must parse.
pub fn check(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load(config_path).context("failed to load configuration")?;

    let mut names = HashSet::new();
    for def in &settings.jobs {
        for parent in &def.depends_on {
            if !names.contains(parent.as_str()) {
                bail!("job {:?} depends on unknown job {:?}", def.name, parent);
            }
        }
        if !names.insert(def.name.as_str()) {
            bail!("duplicate job name in config: {:?}", def.name);
        }
        // A job with dependencies never arms its own schedule, so only
        // independent schedules need to parse.
        if def.depends_on.is_empty() && !def.schedule.is_empty() {
            Schedule::parse(&def.schedule)
                .with_context(|| format!("job {:?} has an invalid schedule", def.name))?;
        }
    }

    println!("configuration OK: {} job(s)", settings.jobs.len());
    Ok(())
}

/// Resolve when the process receives Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("received SIGTERM, shutting down");
        }
    }
}
