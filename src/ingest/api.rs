//! Paginated API ingestor

use super::{Ingest, IngestReport};
use crate::config::FetchConfig;
use crate::error::Result;
use crate::http::{HttpTransport, Sleeper};
use crate::pagination::Paginator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Ingests a paginated HTTPS API through [`HttpTransport`] and [`Paginator`]
#[derive(Debug)]
pub struct ApiIngestor {
    transport: HttpTransport,
}

impl ApiIngestor {
    /// Create an ingestor for a validated config
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }

    /// Replace the sleeper used for backoff and rate-limit waits
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.transport = self.transport.with_sleeper(sleeper);
        self
    }

    /// The config this ingestor was built with
    pub fn config(&self) -> &FetchConfig {
        self.transport.config()
    }
}

#[async_trait]
impl Ingest for ApiIngestor {
    fn name(&self) -> &str {
        "api"
    }

    async fn ingest(&self) -> IngestReport {
        info!(url = %self.config().url(), "Starting API ingestion");
        let report = Paginator::new(&self.transport, self.config()).run().await;
        info!("{}", report.summary());
        report
    }
}
