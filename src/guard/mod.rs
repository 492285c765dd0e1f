//! Payload guard
//!
//! Structural safety checks applied to every page before its records are
//! looked at: raw size first, then parseability, then nesting depth on the
//! parsed value.

mod shape;

pub use shape::JsonShape;

use crate::http::RawResponse;
use serde_json::Value;

/// True if the raw body fits within `max_bytes`
pub fn check_size(raw: &RawResponse, max_bytes: usize) -> bool {
    !raw.truncated && raw.byte_len <= max_bytes
}

/// Parse a raw body as JSON
pub fn parse_payload(raw: &RawResponse) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(&raw.body)
}

/// True if no container in `value` sits deeper than `max_depth`.
///
/// The outermost object or array is at depth 1 and each level of nesting adds
/// one. Scalars never fail, wherever they sit, so `{"a": 1}` has depth 1 and
/// `{"data": [{"sku": "A"}]}` has depth 3.
pub fn check_depth(value: &Value, max_depth: usize) -> bool {
    within_depth(value, 1, max_depth)
}

fn within_depth(value: &Value, depth: usize, max_depth: usize) -> bool {
    match JsonShape::of(value) {
        JsonShape::Scalar => true,
        JsonShape::Object(map) => {
            depth <= max_depth && map.values().all(|v| within_depth(v, depth + 1, max_depth))
        }
        JsonShape::Array(items) => {
            depth <= max_depth && items.iter().all(|v| within_depth(v, depth + 1, max_depth))
        }
    }
}

/// Nesting depth of a value, counted the way [`check_depth`] counts it
pub fn nesting_depth(value: &Value) -> usize {
    match JsonShape::of(value) {
        JsonShape::Scalar => 0,
        JsonShape::Object(map) => 1 + map.values().map(nesting_depth).max().unwrap_or(0),
        JsonShape::Array(items) => 1 + items.iter().map(nesting_depth).max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests;
