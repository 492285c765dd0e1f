//! Decoder implementations
//!
//! Each decoder handles a specific file format.

use super::extract::extract;
use super::types::RecordDecoder;
use crate::error::{Error, Result};
use crate::output::arrow_to_json;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value};

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder: a bare array, or a container object with a data field
#[derive(Debug, Clone)]
pub struct JsonDecoder {
    data_field: String,
}

impl Default for JsonDecoder {
    fn default() -> Self {
        Self {
            data_field: "data".to_string(),
        }
    }
}

impl JsonDecoder {
    /// Create a JSON decoder reading the `data` field of container objects
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a custom data field
    pub fn with_data_field(field: impl Into<String>) -> Self {
        Self {
            data_field: field.into(),
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str, source: &str) -> Result<Vec<Value>> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::decode(source, format!("invalid JSON: {e}")))?;
        Ok(extract(value, &self.data_field))
    }
}

// ============================================================================
// JSONL Decoder
// ============================================================================

/// JSON Lines decoder (one JSON object per line)
#[derive(Debug, Clone, Default)]
pub struct JsonlDecoder;

impl JsonlDecoder {
    /// Create a new JSONL decoder
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for JsonlDecoder {
    fn decode(&self, body: &str, source: &str) -> Result<Vec<Value>> {
        let mut records = Vec::new();

        for (line_num, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(line).map_err(|e| {
                Error::decode(source, format!("invalid JSON at line {}: {e}", line_num + 1))
            })?;

            records.push(value);
        }

        Ok(records)
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// CSV decoder with a header row and scalar type inference
#[derive(Debug, Clone)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvDecoder {
    /// Create a comma-separated decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a custom single-byte delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl RecordDecoder for CsvDecoder {
    fn decode(&self, body: &str, source: &str) -> Result<Vec<Value>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| Error::decode(source, format!("invalid CSV header: {e}")))?
            .clone();

        let mut records = Vec::new();
        for (row_idx, row) in reader.records().enumerate() {
            // Rows are 1-based and the header is row 1
            let row = row.map_err(|e| {
                Error::decode(source, format!("invalid CSV row {}: {e}", row_idx + 2))
            })?;

            let mut obj = Map::new();
            for (header, field) in headers.iter().zip(row.iter()) {
                obj.insert(header.to_string(), parse_csv_value(field));
            }
            records.push(Value::Object(obj));
        }

        Ok(records)
    }
}

/// Infer a JSON scalar from a CSV field
fn parse_csv_value(value: &str) -> Value {
    if value.is_empty() {
        return Value::Null;
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }

    if let Ok(n) = value.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    match value {
        "true" | "TRUE" | "True" => Value::Bool(true),
        "false" | "FALSE" | "False" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

// ============================================================================
// Parquet
// ============================================================================

/// Decode a Parquet file into JSON records
pub fn decode_parquet(bytes: Bytes, source: &str) -> Result<Vec<Value>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .and_then(|builder| builder.build())
        .map_err(|e| Error::decode(source, format!("invalid Parquet: {e}")))?;

    let mut records = Vec::new();
    for batch in reader {
        let batch =
            batch.map_err(|e| Error::decode(source, format!("failed reading row group: {e}")))?;
        records.extend(arrow_to_json(&batch)?);
    }

    Ok(records)
}
