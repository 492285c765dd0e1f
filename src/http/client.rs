//! HTTP transport with retry and backoff
//!
//! Fetches a single page, handling:
//! - 401 and other 4xx as immediate halts
//! - 429 as a wait that does not count against the retry budget
//! - 5xx and network failures with exponential backoff
//! - Bounded body reads, so an oversized response never sits fully in memory

use super::rate_limit::RateLimiter;
use super::sleep::{Sleeper, TokioSleeper};
use super::types::{FailureCause, Halt, PageRequest, RawResponse};
use crate::config::FetchConfig;
use crate::error::Result;
use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can produce the raw response for one page
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page, retrying as needed, or halt the run
    async fn fetch_page(&self, page: PageRequest) -> std::result::Result<RawResponse, Halt>;
}

#[async_trait]
impl<'a, T: PageSource + ?Sized> PageSource for &'a T {
    async fn fetch_page(&self, page: PageRequest) -> std::result::Result<RawResponse, Halt> {
        (**self).fetch_page(page).await
    }
}

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Hand the body on
    Success,
    /// 401, halt
    Unauthorized,
    /// 429, wait and retry for free
    RateLimited,
    /// Other 4xx, halt
    ClientError,
    /// 5xx, back off and retry
    ServerError,
}

/// Classify a status code
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        401 => StatusClass::Unauthorized,
        429 => StatusClass::RateLimited,
        400..=499 => StatusClass::ClientError,
        s if s >= 500 => StatusClass::ServerError,
        _ => StatusClass::Success,
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
enum Attempt {
    Success(RawResponse),
    Unauthorized,
    RateLimited { retry_after: Option<Duration> },
    ClientError(u16),
    Retryable(FailureCause),
}

/// HTTP implementation of [`PageSource`]
pub struct HttpTransport {
    client: Client,
    config: FetchConfig,
    sleeper: Arc<dyn Sleeper>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpTransport {
    /// Create a transport for a validated config
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        let rate_limiter = config.requests_per_second().map(RateLimiter::per_second);

        Ok(Self {
            client,
            config,
            sleeper: Arc::new(TokioSleeper),
            rate_limiter,
        })
    }

    /// Replace the sleeper used for backoff and rate-limit waits
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The config this transport was built with
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Backoff delay after `consumed` failed attempts: one unit, doubling,
    /// capped
    pub fn calculate_backoff(&self, consumed: u32) -> Duration {
        let factor = 2u32.saturating_pow(consumed);
        let delay = self
            .config
            .backoff_unit()
            .checked_mul(factor)
            .unwrap_or(Duration::MAX);
        std::cmp::min(delay, self.config.max_backoff())
    }

    async fn attempt(&self, page: PageRequest) -> Attempt {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let request = self
            .client
            .get(self.config.url())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token()))
            .header(ACCEPT, "application/json")
            .query(&[
                ("page", page.page.to_string()),
                ("limit", page.page_size.to_string()),
            ]);

        let mut response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Retryable(FailureCause::Network {
                    message: e.to_string(),
                })
            }
        };

        let status = response.status().as_u16();
        match classify_status(status) {
            StatusClass::Unauthorized => return Attempt::Unauthorized,
            StatusClass::RateLimited => {
                return Attempt::RateLimited {
                    retry_after: parse_retry_after(response.headers(), Utc::now()),
                }
            }
            StatusClass::ClientError => return Attempt::ClientError(status),
            StatusClass::ServerError => {
                return Attempt::Retryable(FailureCause::ServerError { status })
            }
            StatusClass::Success => {}
        }

        // Read the body in chunks and stop once past the payload limit.
        let limit = self.config.limits().max_payload_bytes;
        let mut body = BytesMut::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    if body.len() > limit {
                        debug!(
                            "Page {}: body passed {} bytes, stopped reading",
                            page.page, limit
                        );
                        return Attempt::Success(RawResponse {
                            status,
                            byte_len: body.len(),
                            body: body.freeze(),
                            truncated: true,
                        });
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return Attempt::Retryable(FailureCause::Network {
                        message: e.to_string(),
                    })
                }
            }
        }

        Attempt::Success(RawResponse::new(status, body.freeze()))
    }
}

#[async_trait]
impl PageSource for HttpTransport {
    async fn fetch_page(&self, page: PageRequest) -> std::result::Result<RawResponse, Halt> {
        let max_attempts = self.config.max_retries();
        let mut consumed = 0u32;
        let mut last_failure = None;

        while consumed < max_attempts {
            match self.attempt(page).await {
                Attempt::Success(raw) => {
                    debug!(
                        "Page {}: HTTP {} with {} bytes",
                        page.page, raw.status, raw.byte_len
                    );
                    return Ok(raw);
                }
                Attempt::Unauthorized => {
                    warn!("Page {}: unauthorized (401), halting", page.page);
                    return Err(Halt::Unauthorized);
                }
                Attempt::ClientError(status) => {
                    warn!("Page {}: client error {}, halting", page.page, status);
                    return Err(Halt::ClientError { status });
                }
                Attempt::RateLimited { retry_after } => {
                    let delay = match retry_after {
                        Some(asked) if asked > self.config.max_retry_after() => {
                            warn!(
                                "Page {}: Retry-After of {:?} exceeds the {:?} ceiling, clamping",
                                page.page,
                                asked,
                                self.config.max_retry_after()
                            );
                            self.config.max_retry_after()
                        }
                        Some(asked) => asked,
                        None => self.calculate_backoff(consumed),
                    };
                    warn!(
                        "Page {}: rate limited (429), waiting {:?} before retrying",
                        page.page, delay
                    );
                    self.sleeper.sleep(delay).await;
                }
                Attempt::Retryable(cause) => {
                    consumed += 1;
                    if consumed < max_attempts {
                        let delay = self.calculate_backoff(consumed - 1);
                        warn!(
                            "Page {}: {}, attempt {}/{}, retrying in {:?}",
                            page.page, cause, consumed, max_attempts, delay
                        );
                        self.sleeper.sleep(delay).await;
                    } else {
                        warn!(
                            "Page {}: {}, attempt {}/{}, giving up",
                            page.page, cause, consumed, max_attempts
                        );
                    }
                    last_failure = Some(cause);
                }
            }
        }

        Err(Halt::RetriesExhausted {
            attempts: consumed,
            last: last_failure.unwrap_or(FailureCause::Network {
                message: "no attempt completed".to_string(),
            }),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Parse a Retry-After header, as delay-seconds or an HTTP date
pub(super) fn parse_retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

