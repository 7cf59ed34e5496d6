//! Metronome daemon library exports.
//!
//! This crate provides the CLI daemon binary for the metronome job
//! scheduler.
//!
//! # Modules
//!
//! - `cli`: command-line argument parsing with clap
//! - `commands`: command implementations (run, check)
//! - `settings`: layered configuration loading

pub mod cli;
pub mod commands;
pub mod settings;

pub use cli::{Cli, Commands};
pub use commands::{check, register_jobs, run};
pub use settings::{JobDefinition, Settings};
