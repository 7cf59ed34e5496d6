//! CLI argument parsing for the metronome daemon.

use clap::{Parser, Subcommand};

/// Metronome Daemon
///
/// A single-process job scheduler driving commands on interval-notation
/// schedules.
#[derive(Parser, Debug)]
#[command(name = "metronome-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler in the foreground until interrupted
    Run,

    /// Validate the config file and its job definitions, then exit
    Check,
}
