// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Inventory Ingest
//!
//! A resilient ingestion pipeline for inventory records. Pulls paginated
//! JSON from an HTTP API (or files from a directory or S3 bucket), guards
//! every payload, keeps the records that carry the required fields and
//! collects them into a tabular dataset.
//!
//! ## Features
//!
//! - **Resilient transport**: bounded retries with exponential backoff, `Retry-After` aware 429 handling
//! - **Payload guards**: size, parse and nesting-depth checks before anything is kept
//! - **Schema filter**: records missing a required field are dropped with a diagnostic
//! - **Page-number pagination**: stops cleanly on an empty page, aborts on a bad one, keeps what was collected
//! - **File sources**: CSV, JSON, JSONL and Parquet from local directories or object stores
//! - **Arrow output**: dataset export to Parquet or JSONL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use inventory_ingest::{ApiIngestor, FetchConfig, Ingest, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = FetchConfig::builder()
//!         .base_url("https://inventory.example.com")
//!         .endpoint("/v1/stock")
//!         .token("token")
//!         .build()?;
//!
//!     let report = ApiIngestor::new(config)?.ingest().await;
//!     println!("{}", report.summary());
//!     for row in report.dataset.rows() {
//!         // Process rows
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Ingest interface                          │
//! │        ingest() → IngestReport { dataset, diagnostics, ... }     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────┬───────┴──────┬────────────┬──────────────┐
//! │ Transport │  Guard   │  Extract     │  Schema    │  Paginator   │
//! ├───────────┼──────────┼──────────────┼────────────┼──────────────┤
//! │ Retry     │ Size     │ data field   │ Required   │ page=1,2,... │
//! │ Backoff   │ Parse    │ CSV / JSONL  │ fields     │ Termination  │
//! │ 429 wait  │ Depth    │ Parquet      │            │ Diagnostics  │
//! └───────────┴──────────┴──────────────┴────────────┴──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline and fetch configuration
pub mod config;

/// Structured run diagnostics
pub mod diagnostics;

/// HTTP transport with retry, backoff and rate limiting
pub mod http;

/// Payload size, parse and depth guards
pub mod guard;

/// Record extraction and file decoders (JSON, JSONL, CSV, Parquet)
pub mod decode;

/// Required-field filtering
pub mod schema;

/// Page-number pagination state machine
pub mod pagination;

/// Accumulated tabular dataset
pub mod dataset;

/// Arrow/Parquet output
pub mod output;

/// Ingestors for each source kind
pub mod ingest;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{load_config, load_config_str, FetchConfig, Limits, PipelineConfig};
pub use dataset::Dataset;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{Error, Result};
pub use ingest::{from_config, ApiIngestor, Ingest, IngestReport, LocalIngestor, ObjectStoreIngestor};
pub use pagination::{IngestStats, Paginator, Termination};
pub use schema::SchemaFilter;
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
