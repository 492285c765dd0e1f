//! CLI runner - loads the pipeline, runs it, reports and exports

use crate::cli::commands::{Cli, ReportFormat};
use crate::config::load_config;
use crate::error::Result;
use crate::ingest::{self, IngestReport};
use crate::output::write_dataset;
use crate::types::Severity;
use serde_json::json;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the pipeline once and return its report.
    ///
    /// Errors are configuration or export failures; whatever happened during
    /// ingestion is in the report.
    pub async fn run(&self) -> Result<IngestReport> {
        let config = load_config(&self.cli.config)?;
        let kind = self.cli.source.unwrap_or(config.source);
        let ingestor = ingest::from_config(&config, kind)?;

        let report = ingestor.ingest().await;
        println!("{}", self.render(&report)?);

        if let Some(path) = &self.cli.output {
            let rows = write_dataset(&report.dataset, path)?;
            info!("Wrote {rows} rows to {}", path.display());
        }

        Ok(report)
    }

    /// Render a report in the selected format
    pub fn render(&self, report: &IngestReport) -> Result<String> {
        match self.cli.format {
            ReportFormat::Pretty => {
                let mut lines = vec![report.summary()];
                lines.extend(
                    report
                        .diagnostics
                        .iter()
                        .filter(|d| d.severity >= Severity::Warn)
                        .map(|d| format!("  {d}")),
                );
                Ok(lines.join("\n"))
            }
            ReportFormat::Json => {
                let doc = json!({
                    "source": report.source,
                    "termination": report.termination.to_string(),
                    "fatal": report.is_fatal(),
                    "rows": report.dataset.len(),
                    "columns": report.dataset.columns(),
                    "stats": report.stats,
                    "diagnostics": report.diagnostics,
                    "started_at": report.started_at,
                    "finished_at": report.finished_at,
                });
                Ok(serde_json::to_string(&doc)?)
            }
        }
    }
}
