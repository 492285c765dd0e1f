//! Output module
//!
//! Arrow conversion and dataset export.
//!
//! # Overview
//!
//! - Inferring Arrow schemas from rows, in first-seen column order
//! - Converting rows to Arrow RecordBatches and back
//! - Writing Parquet files or JSON lines

mod schema;
mod writer;

pub use schema::{arrow_to_json, infer_schema, json_to_arrow};
pub use writer::{write_dataset, write_jsonl, ParquetWriter, ParquetWriterConfig};
