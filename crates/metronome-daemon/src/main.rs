//! Metronome Daemon
//!
//! A single-process job scheduler: commands run on interval-notation
//! schedules, failures are retried within a per-occurrence budget, and
//! dependent jobs cascade on success.
//!
//! # Usage
//!
//! ```bash
//! metronome-daemon run [--config PATH] [--log-level LEVEL]
//! metronome-daemon check [--config PATH]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (--config)
//! 3. Environment variables (METRONOME_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use metronome_daemon::{check, run, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run(cli.config.as_deref(), cli.log_level.as_deref()).await?;
        }
        Commands::Check => {
            check(cli.config.as_deref())?;
        }
    }

    Ok(())
}
