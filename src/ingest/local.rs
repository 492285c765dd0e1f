//! Local directory ingestor

use super::{FileRun, Ingest, IngestReport};
use crate::config::LocalConfig;
use crate::decode::decode_bytes;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Reads every file of the configured format under a directory
#[derive(Debug, Clone)]
pub struct LocalIngestor {
    config: LocalConfig,
}

impl LocalIngestor {
    /// Create an ingestor for a directory
    pub fn new(config: LocalConfig) -> Self {
        Self { config }
    }

    /// The config this ingestor was built with
    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    /// Matching files in walk order (sorted by name within each directory)
    fn collect_files(&self, run: &mut FileRun) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(&self.config.path).sort_by_file_name();
        if !self.config.recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file()
                        && self.config.file_type.matches(&path.to_string_lossy())
                    {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let source = e
                        .path()
                        .map_or_else(|| self.config.path.display().to_string(), |p| {
                            p.display().to_string()
                        });
                    warn!(source = %source, "Cannot walk: {e}");
                    run.add_failure(&source, format!("cannot walk directory: {e}"));
                }
            }
        }
        files
    }
}

#[async_trait]
impl Ingest for LocalIngestor {
    fn name(&self) -> &str {
        "local"
    }

    async fn ingest(&self) -> IngestReport {
        let location = self.config.path.display().to_string();
        info!(
            path = %location,
            format = self.config.file_type.extension(),
            recursive = self.config.recursive,
            "Starting local ingestion"
        );

        let mut run = FileRun::new();
        let files = self.collect_files(&mut run);

        for path in files {
            let source = path.display().to_string();
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    run.add_failure(&source, format!("cannot read file: {e}"));
                    continue;
                }
            };

            match decode_bytes(self.config.file_type, bytes, &source) {
                Ok((records, converted)) => run.add_decoded(&source, records, converted),
                Err(e) => run.add_failure(&source, e.to_string()),
            }
        }

        let report = run.finish(self.name(), &location);
        info!("{}", report.summary());
        report
    }
}
