//! Record extraction and file decoders
//!
//! Supports: JSON (array or container object), JSONL, CSV, Parquet
//!
//! # Overview
//!
//! [`extract`] turns a parsed API payload into its candidate records. The
//! decoders turn whole files or objects into records for the local and
//! object-store ingestors, reusing the same extraction rules for JSON.

mod decoders;
mod extract;
mod types;

pub use decoders::{decode_parquet, CsvDecoder, JsonDecoder, JsonlDecoder};
pub use extract::extract;
pub use types::{decode_bytes, decode_text, to_utf8, RecordDecoder};
