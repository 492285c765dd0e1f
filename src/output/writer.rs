//! Dataset writers
//!
//! Parquet through the Arrow writer, and JSON lines.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::types::JsonObject;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
    statistics_enabled: bool,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
            statistics_enabled: true,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Enable or disable column statistics
    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    /// Use ZSTD compression
    #[must_use]
    pub fn zstd(mut self) -> Self {
        self.compression = Compression::ZSTD(parquet::basic::ZstdLevel::default());
        self
    }

    /// Get row group size
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size);

        if !self.statistics_enabled {
            builder =
                builder.set_statistics_enabled(parquet::file::properties::EnabledStatistics::None);
        }

        builder.build()
    }
}

/// Writes record batches as Parquet, to memory or to a file
#[derive(Debug, Clone, Default)]
pub struct ParquetWriter {
    config: ParquetWriterConfig,
}

impl ParquetWriter {
    /// Create a writer with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom settings
    pub fn with_config(config: ParquetWriterConfig) -> Self {
        Self { config }
    }

    /// Encode a batch as an in-memory Parquet file
    pub fn to_bytes(&self, batch: &RecordBatch) -> Result<Bytes> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer, batch)?;
        Ok(Bytes::from(buffer))
    }

    /// Write a batch to a Parquet file, returning the number of rows written
    pub fn write_file(&self, path: impl AsRef<Path>, batch: &RecordBatch) -> Result<usize> {
        let file = File::create(path.as_ref())
            .map_err(|e| Error::output(format!("Failed to create file: {e}")))?;
        self.write_to(file, batch)?;
        Ok(batch.num_rows())
    }

    fn write_to<W: Write + Send>(&self, sink: W, batch: &RecordBatch) -> Result<()> {
        let props = self.config.build_properties();
        let mut writer = ArrowWriter::try_new(sink, batch.schema(), Some(props))
            .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;

        writer
            .write(batch)
            .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
        Ok(())
    }
}

/// Write rows as JSON lines, returning the number of rows written
pub fn write_jsonl(path: impl AsRef<Path>, rows: &[JsonObject]) -> Result<usize> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(rows.len())
}

/// Write a dataset to `path`, choosing the format from the extension
/// (`.parquet`, or `.jsonl` / `.json` for JSON lines)
pub fn write_dataset(dataset: &Dataset, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("parquet") => ParquetWriter::new().write_file(path, &dataset.to_record_batch()?),
        Some("jsonl" | "json") => write_jsonl(path, dataset.rows()),
        _ => Err(Error::output(format!(
            "Unsupported output file '{}': expected .parquet, .jsonl or .json",
            path.display()
        ))),
    }
}
