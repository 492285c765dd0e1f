//! Common types used throughout inventory-ingest
//!
//! This module contains shared type definitions, type aliases,
//! and small enums used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type, also the representation of a single record
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Source Kind
// ============================================================================

/// Which ingestor a pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Paginated HTTP API
    #[default]
    Api,
    /// Local directory of files
    Local,
    /// S3 bucket (or any object store)
    S3,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Local => write!(f, "local"),
            Self::S3 => write!(f, "s3"),
        }
    }
}

// ============================================================================
// File Format
// ============================================================================

/// Format of files read by the local and object-store ingestors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Comma separated values with a header row
    #[default]
    Csv,
    /// A JSON array, or an object with a data field
    Json,
    /// JSON Lines (one object per line)
    Jsonl,
    /// Apache Parquet
    Parquet,
}

impl FileFormat {
    /// File extension (without the dot) used to select files
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Parquet => "parquet",
        }
    }

    /// Whether a path or object key carries this format's extension
    pub fn matches(self, name: &str) -> bool {
        name.rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(self.extension()))
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Severity> for tracing::Level {
    fn from(level: Severity) -> Self {
        match level {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_serde() {
        let kind: SourceKind = serde_json::from_str("\"s3\"").unwrap();
        assert_eq!(kind, SourceKind::S3);

        let json = serde_json::to_string(&SourceKind::Local).unwrap();
        assert_eq!(json, "\"local\"");
        assert_eq!(SourceKind::default(), SourceKind::Api);
    }

    #[test]
    fn test_file_format_matches() {
        assert!(FileFormat::Csv.matches("stock/2024-01.csv"));
        assert!(FileFormat::Csv.matches("STOCK.CSV"));
        assert!(!FileFormat::Csv.matches("stock.csv.bak"));
        assert!(FileFormat::Parquet.matches("part-0001.parquet"));
        assert!(!FileFormat::Json.matches("items.jsonl"));
        assert!(!FileFormat::Json.matches("README"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert_eq!(tracing::Level::WARN, tracing::Level::from(Severity::Warn));
    }
}
