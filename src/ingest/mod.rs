//! Ingestion contract and ingestors
//!
//! # Overview
//!
//! Every source kind implements [`Ingest`]: one call, one [`IngestReport`].
//! Runtime failures never surface as errors; they end the run and show up in
//! the report's termination and diagnostics, next to whatever data was
//! gathered. Only building an ingestor can fail.
//!
//! - [`ApiIngestor`] - paginated HTTPS API
//! - [`LocalIngestor`] - files in a local directory
//! - [`ObjectStoreIngestor`] - objects in S3 or any `object_store` backend

mod api;
mod local;
mod store;

pub use api::ApiIngestor;
pub use local::LocalIngestor;
pub use store::ObjectStoreIngestor;

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::pagination::{IngestStats, Termination};
use crate::types::{JsonValue, SourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::debug;

/// A source that produces a dataset
#[async_trait]
pub trait Ingest: Send + Sync {
    /// Short name of the source kind, used in logs and reports
    fn name(&self) -> &str;

    /// Run once, from the beginning of the source
    async fn ingest(&self) -> IngestReport;
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Name of the ingestor that ran
    pub source: String,
    /// Accepted rows, also after an abort
    pub dataset: Dataset,
    /// Drops, warnings and the reason the run ended
    pub diagnostics: Diagnostics,
    /// How the run ended
    pub termination: Termination,
    /// Counters
    pub stats: IngestStats,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub finished_at: DateTime<Utc>,
}

impl IngestReport {
    /// True if the run stopped for a reason retrying cannot fix
    pub fn is_fatal(&self) -> bool {
        self.termination.is_fatal()
    }

    /// One-line description for operators
    pub fn summary(&self) -> String {
        format!(
            "{}: {} with {} rows, {} columns, {} diagnostics in {} ms",
            self.source,
            self.termination,
            self.dataset.len(),
            self.dataset.columns().len(),
            self.diagnostics.len(),
            self.stats.duration_ms
        )
    }
}

/// Accumulator shared by the file and object ingestors
struct FileRun {
    dataset: Dataset,
    diagnostics: Diagnostics,
    stats: IngestStats,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl FileRun {
    fn new() -> Self {
        Self {
            dataset: Dataset::new(),
            diagnostics: Diagnostics::new(),
            stats: IngestStats::new(),
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    /// Add the records decoded from one file or object
    fn add_decoded(&mut self, source: &str, records: Vec<JsonValue>, converted: Option<&str>) {
        if let Some(encoding) = converted {
            self.diagnostics.push(
                Diagnostic::warn(
                    DiagnosticKind::EncodingConverted,
                    format!("not valid UTF-8, converted from {encoding}"),
                )
                .with_source(source),
            );
        }

        let total = records.len();
        let mut kept = 0;
        for (index, record) in records.into_iter().enumerate() {
            if let JsonValue::Object(row) = record {
                self.dataset.push(row);
                kept += 1;
            } else {
                self.diagnostics.push(
                    Diagnostic::warn(
                        DiagnosticKind::SchemaViolation,
                        format!("record {index} is not an object"),
                    )
                    .with_source(source)
                    .with_record_index(index),
                );
            }
        }

        self.stats.add_source(total, kept);
        debug!(source, rows = kept, "Decoded source");
    }

    /// Record a file or object that could not be read or decoded
    fn add_failure(&mut self, source: &str, message: impl Into<String>) {
        self.stats.add_failed_source();
        self.diagnostics.push(
            Diagnostic::error(DiagnosticKind::SourceUnreadable, message).with_source(source),
        );
    }

    fn finish(mut self, name: &str, location: &str) -> IngestReport {
        if self.stats.sources_read + self.stats.sources_failed == 0 {
            self.diagnostics.push(
                Diagnostic::warn(DiagnosticKind::NoSourceData, "no matching files found")
                    .with_source(location),
            );
        }

        let termination = Termination::completed(self.dataset.len());
        self.diagnostics.push(Diagnostic::info(
            DiagnosticKind::Completed,
            format!(
                "ingestion completed: {} rows from {} sources",
                self.dataset.len(),
                self.stats.sources_read
            ),
        ));

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(self.start.elapsed().as_millis() as u64);

        IngestReport {
            source: name.to_string(),
            dataset: self.dataset,
            diagnostics: self.diagnostics,
            termination,
            stats: self.stats,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Build the ingestor for `kind` from a pipeline config
pub fn from_config(config: &PipelineConfig, kind: SourceKind) -> Result<Box<dyn Ingest>> {
    let ingestor: Box<dyn Ingest> = match kind {
        SourceKind::Api => Box::new(ApiIngestor::new(config.fetch_config()?)?),
        SourceKind::Local => Box::new(LocalIngestor::new(config.local_config()?.clone())),
        SourceKind::S3 => Box::new(ObjectStoreIngestor::from_s3_config(config.s3_config()?)?),
    };
    Ok(ingestor)
}
