//! CLI argument parsing

use crate::types::SourceKind;
use clap::Parser;
use std::path::PathBuf;

/// Ingest inventory records from an API, a directory or an object store
#[derive(Parser, Debug)]
#[command(name = "inventory-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Source to run, overriding `source` in the config
    #[arg(short, long, value_enum)]
    pub source: Option<SourceKind>,

    /// Write the dataset to this file (.parquet, .jsonl or .json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// How the run report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Summary line followed by one line per warning or error
    Pretty,
    /// A single JSON document
    Json,
}
