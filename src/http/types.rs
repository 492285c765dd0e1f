//! Transport types
//!
//! Requests, raw responses, and the halt signal that stops a run.

use crate::diagnostics::DiagnosticKind;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// One page to fetch. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,
    /// Records requested per page
    pub page_size: u32,
}

impl PageRequest {
    /// Create a page request
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// The first page of a run
    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    /// The page after this one
    #[must_use]
    pub fn next(self) -> Self {
        Self::new(self.page + 1, self.page_size)
    }
}

/// A successful response, as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Bytes received. When `truncated` is set this is only a lower bound.
    pub byte_len: usize,
    /// Body bytes
    pub body: Bytes,
    /// Reading stopped early because the body outgrew the payload limit
    pub truncated: bool,
}

impl RawResponse {
    /// A complete response
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            byte_len: body.len(),
            body,
            truncated: false,
        }
    }
}

/// Why the last retryable attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// 5xx response
    ServerError {
        /// HTTP status code
        status: u16,
    },
    /// Timeout, connection failure or broken body
    Network {
        /// Error text from the client
        message: String,
    },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerError { status } => write!(f, "server error {status}"),
            Self::Network { message } => write!(f, "network error: {message}"),
        }
    }
}

/// A transport-level signal that stops the whole pagination loop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    #[error("unauthorized (HTTP 401)")]
    Unauthorized,

    #[error("client error (HTTP {status})")]
    ClientError { status: u16 },

    #[error("retries exhausted after {attempts} attempts, last failure: {last}")]
    RetriesExhausted { attempts: u32, last: FailureCause },
}

impl Halt {
    /// HTTP status associated with the halt, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::ClientError { status } => Some(*status),
            Self::RetriesExhausted {
                last: FailureCause::ServerError { status },
                ..
            } => Some(*status),
            Self::RetriesExhausted { .. } => None,
        }
    }

    /// Diagnostic kind reported for this halt
    pub fn diagnostic_kind(&self) -> DiagnosticKind {
        match self {
            Self::Unauthorized => DiagnosticKind::Unauthorized,
            Self::ClientError { .. } => DiagnosticKind::ClientError,
            Self::RetriesExhausted { .. } => DiagnosticKind::RetriesExhausted,
        }
    }

    /// No amount of retrying will help; the configuration needs fixing
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
