use crate::types::JsonObject;
use serde_json::Value;

/// The three shapes a JSON value can take, as far as ingestion cares
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonShape<'a> {
    /// A JSON object
    Object(&'a JsonObject),
    /// A JSON array
    Array(&'a [Value]),
    /// Anything else: null, bool, number or string
    Scalar,
}

impl<'a> JsonShape<'a> {
    /// Classify a value
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(map),
            Value::Array(items) => Self::Array(items),
            _ => Self::Scalar,
        }
    }
}
