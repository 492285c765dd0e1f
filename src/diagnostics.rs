//! Structured diagnostics returned alongside every dataset
//!
//! Each terminal state and each dropped record produces one [`Diagnostic`].
//! They are collected into the [`crate::ingest::IngestReport`] and mirrored to
//! `tracing` as they are recorded.

use crate::types::Severity;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error, info, warn};

/// What a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The API rejected the bearer token (401)
    Unauthorized,
    /// A 4xx other than 401/429
    ClientError,
    /// Server errors or network failures used up the retry budget
    RetriesExhausted,
    /// Raw body larger than the payload limit
    PayloadTooLarge,
    /// Body is not parseable JSON
    MalformedBody,
    /// Parsed body nests deeper than allowed
    TooDeeplyNested,
    /// A page holds more records than one batch may
    BatchTooLarge,
    /// A record was dropped for missing required fields
    SchemaViolation,
    /// The configured page ceiling stopped the run
    PageLimitReached,
    /// A file was not UTF-8 and was converted from its detected encoding
    EncodingConverted,
    /// A file or object could not be read or decoded
    SourceUnreadable,
    /// The source held nothing to ingest
    NoSourceData,
    /// The run finished normally
    Completed,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::ClientError => "client_error",
            Self::RetriesExhausted => "retries_exhausted",
            Self::PayloadTooLarge => "payload_too_large",
            Self::MalformedBody => "malformed_body",
            Self::TooDeeplyNested => "too_deeply_nested",
            Self::BatchTooLarge => "batch_too_large",
            Self::SchemaViolation => "schema_violation",
            Self::PageLimitReached => "page_limit_reached",
            Self::EncodingConverted => "encoding_converted",
            Self::SourceUnreadable => "source_unreadable",
            Self::NoSourceData => "no_source_data",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// A single structured diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Kind of event
    pub kind: DiagnosticKind,
    /// How serious it is
    pub severity: Severity,
    /// Page number, for API ingestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// HTTP status code, when one was involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Position of the record within its page or file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_index: Option<usize>,
    /// Required fields a dropped record lacked
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    /// File path or object key, for file-based ingestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Human readable detail
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with no location attached
    pub fn new(kind: DiagnosticKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            page: None,
            status: None,
            record_index: None,
            missing_fields: Vec::new(),
            source: None,
            message: message.into(),
        }
    }

    /// Create an error diagnostic
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warn(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Warn, message)
    }

    /// Create an info diagnostic
    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(kind, Severity::Info, message)
    }

    /// Attach a page number
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach an HTTP status
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a record position
    #[must_use]
    pub fn with_record_index(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    /// Attach the names of missing required fields
    #[must_use]
    pub fn with_missing_fields(mut self, fields: Vec<String>) -> Self {
        self.missing_fields = fields;
        self
    }

    /// Attach a file path or object key
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Write this diagnostic to the tracing subscriber
    pub fn log(&self) {
        let page = self.page.map(i64::from).unwrap_or(-1);
        let status = self.status.unwrap_or(0);
        let source = self.source.as_deref().unwrap_or("");
        match self.severity {
            Severity::Debug => {
                debug!(kind = %self.kind, page, status, source, "{}", self.message);
            }
            Severity::Info => {
                info!(kind = %self.kind, page, status, source, "{}", self.message);
            }
            Severity::Warn => {
                warn!(kind = %self.kind, page, status, source, "{}", self.message);
            }
            Severity::Error => {
                error!(kind = %self.kind, page, status, source, "{}", self.message);
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.kind)?;
        if let Some(page) = self.page {
            write!(f, " page={page}")?;
        }
        if let Some(status) = self.status {
            write!(f, " status={status}")?;
        }
        if let Some(source) = &self.source {
            write!(f, " source={source}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered collection of diagnostics for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it
    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.0.push(diagnostic);
    }

    /// Record several diagnostics in order
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    /// Iterate in recording order
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Number of diagnostics recorded
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Diagnostics of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }

    /// True if any diagnostic is an error
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    /// Most recent diagnostic
    pub fn last(&self) -> Option<&Diagnostic> {
        self.0.last()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
