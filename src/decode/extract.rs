//! Record extraction from a parsed payload

use serde_json::Value;

/// Pull the candidate records out of a parsed payload.
///
/// - A container object yields the array under `data_field`, or nothing if the
///   field is absent or not an array.
/// - A bare array is returned as-is.
/// - Anything else yields nothing, which the paginator reads as the end of the
///   data.
pub fn extract(parsed: Value, data_field: &str) -> Vec<Value> {
    match parsed {
        Value::Object(mut container) => match container.remove(data_field) {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        Value::Array(records) => records,
        _ => Vec::new(),
    }
}
