//! Pagination control loop
//!
//! # Overview
//!
//! [`Paginator`] drives one run from page 1: fetch, check size, parse, check
//! depth, extract, enforce the batch limit, filter, accumulate, advance. The
//! first failing check ends the run with the matching [`Termination`]; a page
//! with no records ends it normally. Whatever was accumulated before the end
//! is always returned.

mod types;

pub use types::{IngestStats, Termination};

use crate::config::{FetchConfig, Limits};
use crate::dataset::Dataset;
use crate::decode::extract;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::guard::{check_depth, check_size, nesting_depth, parse_payload};
use crate::http::{PageRequest, PageSource};
use crate::ingest::IngestReport;
use crate::schema::SchemaFilter;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

/// Owns the cursor and the accumulator for one run over a [`PageSource`]
pub struct Paginator<S> {
    source: S,
    page_size: u32,
    data_field: String,
    limits: Limits,
    filter: SchemaFilter,
    max_pages: Option<u32>,
    dataset: Dataset,
    diagnostics: Diagnostics,
    stats: IngestStats,
}

impl<S: PageSource> Paginator<S> {
    /// Create a paginator reading pages from `source` with the page size,
    /// limits and required fields of `config`
    pub fn new(source: S, config: &FetchConfig) -> Self {
        Self {
            source,
            page_size: config.page_size(),
            data_field: config.data_field().to_string(),
            limits: *config.limits(),
            filter: SchemaFilter::new(config.required_fields().iter().cloned()),
            max_pages: config.max_pages(),
            dataset: Dataset::new(),
            diagnostics: Diagnostics::new(),
            stats: IngestStats::new(),
        }
    }

    /// Run from page 1 to a terminal state
    pub async fn run(mut self) -> IngestReport {
        let started_at = Utc::now();
        let start = Instant::now();

        let termination = self.drive().await;

        if termination.is_completed() {
            self.diagnostics.push(Diagnostic::info(
                DiagnosticKind::Completed,
                format!(
                    "ingestion completed: {} rows from {} pages",
                    self.dataset.len(),
                    self.stats.pages_fetched
                ),
            ));
        }

        #[allow(clippy::cast_possible_truncation)]
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        IngestReport {
            source: "api".to_string(),
            dataset: self.dataset,
            diagnostics: self.diagnostics,
            termination,
            stats: self.stats,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(&mut self) -> Termination {
        let mut request = PageRequest::first(self.page_size);

        loop {
            let page = request.page;

            if let Some(max) = self.max_pages {
                if page > max {
                    self.diagnostics.push(
                        Diagnostic::warn(
                            DiagnosticKind::PageLimitReached,
                            format!("stopped after the configured {max} pages"),
                        )
                        .with_page(max),
                    );
                    return Termination::completed(self.dataset.len());
                }
            }

            debug!(page, page_size = request.page_size, "Fetching page");

            // 1. transport
            let raw = match self.source.fetch_page(request).await {
                Ok(raw) => raw,
                Err(halt) => {
                    let mut diagnostic = Diagnostic::error(halt.diagnostic_kind(), halt.to_string())
                        .with_page(page);
                    if let Some(status) = halt.status() {
                        diagnostic = diagnostic.with_status(status);
                    }
                    self.diagnostics.push(diagnostic);
                    return Termination::AbortedTransport(halt);
                }
            };
            self.stats.add_page();

            // 2. size, before anything looks inside the body
            if !check_size(&raw, self.limits.max_payload_bytes) {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::PayloadTooLarge,
                        format!(
                            "response body of at least {} bytes exceeds the {} byte limit",
                            raw.byte_len, self.limits.max_payload_bytes
                        ),
                    )
                    .with_page(page)
                    .with_status(raw.status),
                );
                return Termination::AbortedSizeLimit;
            }

            // 3. parse
            let parsed = match parse_payload(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.diagnostics.push(
                        Diagnostic::error(
                            DiagnosticKind::MalformedBody,
                            format!("response body is not valid JSON: {e}"),
                        )
                        .with_page(page)
                        .with_status(raw.status),
                    );
                    return Termination::AbortedMalformed;
                }
            };

            // 4. depth
            if !check_depth(&parsed, self.limits.max_depth) {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::TooDeeplyNested,
                        format!(
                            "response nests {} levels deep, limit is {}",
                            nesting_depth(&parsed),
                            self.limits.max_depth
                        ),
                    )
                    .with_page(page),
                );
                return Termination::AbortedDepthLimit;
            }

            // 5. extract
            let records = extract(parsed, &self.data_field);
            self.stats.add_extracted_page(records.len());
            if records.is_empty() {
                info!(page, rows = self.dataset.len(), "No more records");
                return Termination::completed(self.dataset.len());
            }

            // 6. batch limit, all or nothing for this page
            if records.len() > self.limits.max_batch_records {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::BatchTooLarge,
                        format!(
                            "page holds {} records, limit is {}",
                            records.len(),
                            self.limits.max_batch_records
                        ),
                    )
                    .with_page(page),
                );
                return Termination::AbortedBatchTooLarge;
            }

            // 7. filter and accumulate
            let extracted = records.len();
            let outcome = self.filter.apply(records, page);
            self.stats.add_filtered(outcome.kept.len(), outcome.dropped.len());
            debug!(
                page,
                extracted,
                kept = outcome.kept.len(),
                dropped = outcome.dropped.len(),
                "Page accepted"
            );
            self.diagnostics.extend(outcome.dropped);
            self.dataset.extend(outcome.kept);

            // 8. advance
            request = request.next();
        }
    }
}
