//! CLI module
//!
//! Runs one pipeline from a YAML config, prints the report and optionally
//! exports the dataset.

mod commands;
mod runner;

pub use commands::{Cli, ReportFormat};
pub use runner::Runner;
