//! Configuration types
//!
//! Pipelines are described in YAML ([`PipelineConfig`]). The API section is
//! turned into a validated [`FetchConfig`] before any request is made, so a
//! bad scheme or a zero page size is reported once, up front, as an
//! [`Error`] rather than discovered mid-run.

use crate::error::{Error, Result};
use crate::types::{FileFormat, SourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::{Host, Url};

/// Default largest accepted response body (5 MiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Default deepest accepted JSON nesting
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Default largest accepted page, in records
pub const DEFAULT_MAX_BATCH_RECORDS: usize = 10_000;

/// Default backoff ceiling, in backoff units
pub const DEFAULT_BACKOFF_CAP_UNITS: u32 = 30;

/// Default longest honored `Retry-After` wait, in seconds
pub const DEFAULT_MAX_RETRY_AFTER_SECS: u64 = 300;

// ============================================================================
// Limits
// ============================================================================

/// Structural limits applied to every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest raw body accepted, in bytes
    pub max_payload_bytes: usize,
    /// Deepest nesting accepted in a parsed body
    pub max_depth: usize,
    /// Most records accepted from one page
    pub max_batch_records: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_batch_records: DEFAULT_MAX_BATCH_RECORDS,
        }
    }
}

impl Limits {
    fn validate(&self) -> Result<()> {
        if self.max_payload_bytes == 0 {
            return Err(Error::invalid_value("max_payload_bytes", "must be positive"));
        }
        if self.max_batch_records == 0 {
            return Err(Error::invalid_value("max_batch_records", "must be positive"));
        }
        Ok(())
    }
}

/// Fields every API record must carry by default
pub fn default_required_fields() -> Vec<String> {
    vec!["sku".to_string(), "quantity".to_string()]
}

// ============================================================================
// Fetch Config
// ============================================================================

/// Validated settings for fetching a paginated API
///
/// Only obtainable through [`FetchConfig::builder`], which enforces the https
/// scheme and positive sizes.
#[derive(Clone)]
pub struct FetchConfig {
    base_url: Url,
    endpoint: String,
    token: String,
    page_size: u32,
    timeout: Duration,
    max_retries: u32,
    backoff_unit: Duration,
    backoff_cap_units: u32,
    max_retry_after: Duration,
    user_agent: String,
    data_field: String,
    limits: Limits,
    required_fields: Vec<String>,
    requests_per_second: Option<u32>,
    max_pages: Option<u32>,
}

impl FetchConfig {
    /// Create a new config builder
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::default()
    }

    /// Base URL (always https unless built with the loopback escape hatch)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint path appended to the base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `{base_url}{endpoint}`
    pub fn url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.endpoint
        )
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// Records requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Per-attempt request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Total attempts allowed per page for server and network failures
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// First backoff delay; later delays double from here
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Longest backoff delay
    pub fn max_backoff(&self) -> Duration {
        self.backoff_unit * self.backoff_cap_units
    }

    /// Longest wait honored from a `Retry-After` header
    pub fn max_retry_after(&self) -> Duration {
        self.max_retry_after
    }

    /// User agent sent with every request
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Name of the field holding records in a container object
    pub fn data_field(&self) -> &str {
        &self.data_field
    }

    /// Structural limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Fields a record must carry to be kept
    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Optional client-side pacing
    pub fn requests_per_second(&self) -> Option<u32> {
        self.requests_per_second
    }

    /// Optional ceiling on pages fetched in one run
    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("base_url", &self.base_url.as_str())
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_unit", &self.backoff_unit)
            .field("backoff_cap_units", &self.backoff_cap_units)
            .field("max_retry_after", &self.max_retry_after)
            .field("data_field", &self.data_field)
            .field("limits", &self.limits)
            .field("required_fields", &self.required_fields)
            .finish_non_exhaustive()
    }
}

/// Builder for [`FetchConfig`]
#[derive(Debug, Clone)]
pub struct FetchConfigBuilder {
    base_url: Option<String>,
    endpoint: String,
    token: Option<String>,
    page_size: u32,
    timeout: Duration,
    max_retries: u32,
    backoff_unit: Duration,
    backoff_cap_units: u32,
    max_retry_after: Duration,
    user_agent: String,
    data_field: String,
    limits: Limits,
    required_fields: Vec<String>,
    requests_per_second: Option<u32>,
    max_pages: Option<u32>,
    allow_insecure_loopback: bool,
}

impl Default for FetchConfigBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            endpoint: String::new(),
            token: None,
            page_size: 100,
            timeout: Duration::from_secs(30),
            max_retries: 5,
            backoff_unit: Duration::from_secs(1),
            backoff_cap_units: DEFAULT_BACKOFF_CAP_UNITS,
            max_retry_after: Duration::from_secs(DEFAULT_MAX_RETRY_AFTER_SECS),
            user_agent: format!("inventory-ingest/{}", env!("CARGO_PKG_VERSION")),
            data_field: "data".to_string(),
            limits: Limits::default(),
            required_fields: default_required_fields(),
            requests_per_second: None,
            max_pages: None,
            allow_insecure_loopback: false,
        }
    }
}

impl FetchConfigBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the endpoint path
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the bearer token
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the attempt budget
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the backoff unit and the ceiling in units
    #[must_use]
    pub fn backoff(mut self, unit: Duration, cap_units: u32) -> Self {
        self.backoff_unit = unit;
        self.backoff_cap_units = cap_units;
        self
    }

    /// Set the longest wait honored from a `Retry-After` header
    #[must_use]
    pub fn max_retry_after(mut self, max: Duration) -> Self {
        self.max_retry_after = max;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the container field holding records
    #[must_use]
    pub fn data_field(mut self, field: impl Into<String>) -> Self {
        self.data_field = field.into();
        self
    }

    /// Set structural limits
    #[must_use]
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the required field set
    #[must_use]
    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Pace requests on the client side
    #[must_use]
    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    /// Stop after this many pages
    #[must_use]
    pub fn max_pages(mut self, pages: u32) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Accept plain `http` when the host is a loopback address.
    ///
    /// Meant for tests against a local mock server; any other host still
    /// requires https.
    #[must_use]
    pub fn allow_insecure_loopback(mut self) -> Self {
        self.allow_insecure_loopback = true;
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<FetchConfig> {
        let raw = self
            .base_url
            .ok_or_else(|| Error::missing_field("base_url"))?;
        let base_url = Url::parse(&raw)?;
        check_scheme(&base_url, self.allow_insecure_loopback)?;

        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::missing_field("auth_token"))?;

        if !self.endpoint.is_empty() && !self.endpoint.starts_with('/') {
            return Err(Error::invalid_value("endpoint", "must start with '/'"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }
        if self.max_retries == 0 {
            return Err(Error::invalid_value("max_retries", "must allow at least one attempt"));
        }
        if self.backoff_cap_units == 0 {
            return Err(Error::invalid_value("backoff_cap_units", "must be positive"));
        }
        if self.data_field.is_empty() {
            return Err(Error::invalid_value("data_field", "must not be empty"));
        }
        if self.max_retry_after.is_zero() {
            return Err(Error::invalid_value("max_retry_after", "must be positive"));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value("requests_per_second", "must be positive"));
        }
        if self.max_pages == Some(0) {
            return Err(Error::invalid_value("max_pages", "must be positive"));
        }
        self.limits.validate()?;

        Ok(FetchConfig {
            base_url,
            endpoint: self.endpoint,
            token,
            page_size: self.page_size,
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_unit: self.backoff_unit,
            backoff_cap_units: self.backoff_cap_units,
            max_retry_after: self.max_retry_after,
            user_agent: self.user_agent,
            data_field: self.data_field,
            limits: self.limits,
            required_fields: self.required_fields,
            requests_per_second: self.requests_per_second,
            max_pages: self.max_pages,
        })
    }
}

fn check_scheme(url: &Url, allow_insecure_loopback: bool) -> Result<()> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_insecure_loopback && is_loopback(url) => Ok(()),
        other => Err(Error::InsecureScheme {
            scheme: other.to_string(),
        }),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

// ============================================================================
// Pipeline Config (YAML)
// ============================================================================

/// Complete pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Which section drives the run
    #[serde(default)]
    pub source: SourceKind,

    /// Paginated API settings
    #[serde(default)]
    pub api: Option<ApiConfig>,

    /// Local directory settings
    #[serde(default)]
    pub local: Option<LocalConfig>,

    /// Object store settings
    #[serde(default)]
    pub s3: Option<S3Config>,

    /// Structural limits for API pages
    #[serde(default)]
    pub limits: Limits,

    /// Fields every API record must carry
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
}

impl PipelineConfig {
    /// Build the validated fetch config from the `api` section
    pub fn fetch_config(&self) -> Result<FetchConfig> {
        let api = self.api.as_ref().ok_or_else(|| Error::missing_field("api"))?;

        let mut builder = FetchConfig::builder()
            .base_url(&api.base_url)
            .endpoint(&api.endpoint)
            .token(api.resolve_token()?)
            .page_size(api.page_size)
            .timeout(Duration::from_secs(api.timeout_secs))
            .max_retries(api.max_retries)
            .max_retry_after(Duration::from_secs(api.max_retry_after_secs))
            .data_field(&api.data_field)
            .limits(self.limits)
            .required_fields(self.required_fields.clone());

        if let Some(rps) = api.requests_per_second {
            builder = builder.requests_per_second(rps);
        }
        if let Some(pages) = api.max_pages {
            builder = builder.max_pages(pages);
        }

        builder.build()
    }

    /// The `local` section, or an error naming it
    pub fn local_config(&self) -> Result<&LocalConfig> {
        self.local.as_ref().ok_or_else(|| Error::missing_field("local"))
    }

    /// The `s3` section, or an error naming it
    pub fn s3_config(&self) -> Result<&S3Config> {
        self.s3.as_ref().ok_or_else(|| Error::missing_field("s3"))
    }
}

/// API section of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, must be https
    pub base_url: String,

    /// Endpoint path, e.g. `/v1/inventory`
    #[serde(default)]
    pub endpoint: String,

    /// Inline bearer token
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Environment variable holding the bearer token
    #[serde(default)]
    pub auth_token_env: Option<String>,

    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempt budget per page
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Longest honored `Retry-After` wait in seconds
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,

    /// Container field holding records
    #[serde(default = "default_data_field")]
    pub data_field: String,

    /// Optional client-side pacing
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Optional page ceiling
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl ApiConfig {
    /// Inline token first, then the named environment variable
    fn resolve_token(&self) -> Result<String> {
        if let Some(token) = &self.auth_token {
            return Ok(token.clone());
        }
        if let Some(var) = &self.auth_token_env {
            return std::env::var(var).map_err(|_| {
                Error::invalid_value("auth_token_env", format!("environment variable {var} is not set"))
            });
        }
        Err(Error::missing_field("auth_token"))
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    5
}

fn default_max_retry_after_secs() -> u64 {
    DEFAULT_MAX_RETRY_AFTER_SECS
}

fn default_data_field() -> String {
    "data".to_string()
}

/// Local directory section of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory to walk
    #[serde(default = "default_local_path")]
    pub path: PathBuf,

    /// Format of files to pick up
    #[serde(default)]
    pub file_type: FileFormat,

    /// Descend into subdirectories
    #[serde(default = "default_true")]
    pub recursive: bool,
}

impl LocalConfig {
    /// Config for a directory with defaults for everything else
    pub fn new(path: impl Into<PathBuf>, file_type: FileFormat) -> Self {
        Self {
            path: path.into(),
            file_type,
            recursive: true,
        }
    }
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./data/raw")
}

fn default_true() -> bool {
    true
}

/// Object store section of a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,

    /// Key prefix to list under
    #[serde(default)]
    pub prefix: String,

    /// Format of objects to pick up
    #[serde(default)]
    pub file_type: FileFormat,

    /// AWS region
    #[serde(default)]
    pub region: Option<String>,

    /// Access key id (falls back to the environment)
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key (falls back to the environment)
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,
}

// ============================================================================
// Loading
// ============================================================================

/// Load a pipeline config from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
    load_config_str(&content)
}

/// Parse a pipeline config from a YAML string
pub fn load_config_str(yaml: &str) -> Result<PipelineConfig> {
    Ok(serde_yaml::from_str(yaml)?)
}
