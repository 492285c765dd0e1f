//! HTTP transport module
//!
//! Executes the bounded-retry attempt sequence for a single page.
//!
//! # Features
//!
//! - **Halts**: 401 and other client errors stop the run without retrying
//! - **Rate Limiting**: 429 waits honour `Retry-After` and never consume the retry budget
//! - **Backoff**: exponential backoff for server and network failures
//! - **Pacing**: optional token bucket limiter using governor

mod client;
mod rate_limit;
mod sleep;
mod types;

pub use client::{classify_status, HttpTransport, PageSource, StatusClass};
pub use rate_limit::RateLimiter;
pub use sleep::{RecordingSleeper, Sleeper, TokioSleeper};
pub use types::{FailureCause, Halt, PageRequest, RawResponse};

#[cfg(test)]
mod tests;
