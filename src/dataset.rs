//! In-memory dataset
//!
//! Ordered rows plus the union of their column names in first-seen order.
//! Ingestors grow it page by page; once handed back in a report it is only
//! read.

use crate::error::Result;
use crate::output::json_to_arrow;
use crate::types::{JsonObject, JsonValue};
use arrow::record_batch::RecordBatch;
use indexmap::IndexSet;
use serde::Serialize;

static NULL: JsonValue = JsonValue::Null;

/// Rows accepted by an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    rows: Vec<JsonObject>,
    columns: IndexSet<String>,
    #[serde(skip)]
    order: Vec<String>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, row: JsonObject) {
        for key in row.keys() {
            if !self.columns.contains(key) {
                self.columns.insert(key.clone());
                self.order.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    pub(crate) fn extend(&mut self, rows: impl IntoIterator<Item = JsonObject>) {
        for row in rows {
            self.push(row);
        }
    }

    /// Rows in acceptance order
    pub fn rows(&self) -> &[JsonObject] {
        &self.rows
    }

    /// Column names in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.order
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no rows were accepted
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row`, `column`. Cells a row does not carry read as `Null`;
    /// `None` only when `row` is out of range.
    pub fn value(&self, row: usize, column: &str) -> Option<&JsonValue> {
        self.rows.get(row).map(|r| r.get(column).unwrap_or(&NULL))
    }

    /// Convert to an Arrow RecordBatch with columns in first-seen order
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        json_to_arrow(&self.rows, self.columns())
    }

    /// Take ownership of the rows
    pub fn into_rows(self) -> Vec<JsonObject> {
        self.rows
    }
}

impl FromIterator<JsonObject> for Dataset {
    fn from_iter<I: IntoIterator<Item = JsonObject>>(iter: I) -> Self {
        let mut dataset = Self::new();
        dataset.extend(iter);
        dataset
    }
}
