//! Object store ingestor (S3 and S3-compatible, or any `object_store` backend)

use super::{FileRun, Ingest, IngestReport};
use crate::config::S3Config;
use crate::decode::decode_bytes;
use crate::error::{Error, Result, ResultExt};
use crate::types::FileFormat;
use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Reads every object of the configured format under a prefix
pub struct ObjectStoreIngestor {
    store: Arc<dyn ObjectStore>,
    prefix: Option<ObjectPath>,
    file_type: FileFormat,
    location: String,
}

impl ObjectStoreIngestor {
    /// Create an ingestor over any object store
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str, file_type: FileFormat) -> Self {
        let trimmed = prefix.trim_matches('/');
        let prefix = (!trimmed.is_empty()).then(|| ObjectPath::from(trimmed));
        Self {
            location: format!("{store}/{trimmed}"),
            store,
            prefix,
            file_type,
        }
    }

    /// Create an ingestor for an S3 bucket.
    ///
    /// Credentials and region not set in `config` are read from the usual
    /// `AWS_*` environment variables.
    pub fn from_s3_config(config: &S3Config) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(key) = &config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(endpoint) = &config.endpoint {
            // S3-compatible stores on a private network often speak plain http
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;

        let mut ingestor = Self::new(Arc::new(store), &config.prefix, config.file_type);
        ingestor.location = format!("s3://{}/{}", config.bucket, config.prefix.trim_matches('/'));
        Ok(ingestor)
    }

    /// Where objects are listed from, for logs and diagnostics
    pub fn location(&self) -> &str {
        &self.location
    }

    async fn list(&self) -> Result<Vec<ObjectMeta>> {
        let mut objects: Vec<ObjectMeta> = self
            .store
            .list(self.prefix.as_ref())
            .try_collect()
            .await?;
        objects.retain(|meta| self.file_type.matches(meta.location.as_ref()));
        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    async fn fetch(&self, location: &ObjectPath) -> Result<bytes::Bytes> {
        let object = self
            .store
            .get(location)
            .await
            .context("object fetch failed")?;
        object.bytes().await.context("object read failed")
    }
}

impl fmt::Debug for ObjectStoreIngestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreIngestor")
            .field("location", &self.location)
            .field("file_type", &self.file_type)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Ingest for ObjectStoreIngestor {
    fn name(&self) -> &str {
        "s3"
    }

    async fn ingest(&self) -> IngestReport {
        info!(
            location = %self.location,
            format = self.file_type.extension(),
            "Starting object store ingestion"
        );

        let mut run = FileRun::new();

        let objects = match self.list().await {
            Ok(objects) => objects,
            Err(e) => {
                run.add_failure(&self.location, format!("listing failed: {e}"));
                return run.finish(self.name(), &self.location);
            }
        };

        for meta in objects {
            let source = meta.location.to_string();
            let result = match self.fetch(&meta.location).await {
                Ok(bytes) => decode_bytes(self.file_type, bytes, &source),
                Err(e) => Err(e),
            };

            match result {
                Ok((records, converted)) => run.add_decoded(&source, records, converted),
                Err(e) => run.add_failure(&source, e.to_string()),
            }
        }

        let report = run.finish(self.name(), &self.location);
        info!("{}", report.summary());
        report
    }
}
