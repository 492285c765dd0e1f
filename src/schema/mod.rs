//! Schema filter
//!
//! Drops records that are not objects or lack a required field. Kept records
//! keep their relative order; every drop yields one
//! [`DiagnosticKind::SchemaViolation`] naming the missing fields but never the
//! record's contents. Filtering is pure and never halts a run.

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::types::{JsonObject, JsonValue};

/// Result of filtering one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Records that carry every required field, in input order
    pub kept: Vec<JsonObject>,
    /// One diagnostic per dropped record, in input order
    pub dropped: Vec<Diagnostic>,
}

/// Checks records against a fixed set of required fields
#[derive(Debug, Clone)]
pub struct SchemaFilter {
    required: Vec<String>,
}

impl SchemaFilter {
    /// Create a filter for the given required fields
    pub fn new(required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Required field names
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Required fields absent from `record`, in declaration order
    pub fn missing_fields(&self, record: &JsonObject) -> Vec<String> {
        self.required
            .iter()
            .filter(|field| !record.contains_key(field.as_str()))
            .cloned()
            .collect()
    }

    /// Split `records` into kept objects and drop diagnostics for `page`
    pub fn apply(&self, records: Vec<JsonValue>, page: u32) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for (index, record) in records.into_iter().enumerate() {
            let JsonValue::Object(object) = record else {
                outcome.dropped.push(
                    Diagnostic::warn(
                        DiagnosticKind::SchemaViolation,
                        format!("record {index} is not an object"),
                    )
                    .with_page(page)
                    .with_record_index(index)
                    .with_missing_fields(self.required.clone()),
                );
                continue;
            };

            let missing = self.missing_fields(&object);
            if missing.is_empty() {
                outcome.kept.push(object);
            } else {
                outcome.dropped.push(
                    Diagnostic::warn(
                        DiagnosticKind::SchemaViolation,
                        format!("record {index} missing required fields: {}", missing.join(", ")),
                    )
                    .with_page(page)
                    .with_record_index(index)
                    .with_missing_fields(missing),
                );
            }
        }

        outcome
    }
}

/// Filter `records` against `required` fields
pub fn filter(records: Vec<JsonValue>, required: &[String], page: u32) -> FilterOutcome {
    SchemaFilter::new(required.iter().cloned()).apply(records, page)
}
