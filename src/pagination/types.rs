//! Pagination types
//!
//! Terminal states of a run and the counters collected along the way.

use crate::http::Halt;
use serde::Serialize;
use std::fmt;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The source ran out of data before any row was accepted
    CompletedEmpty,
    /// The source ran out of data after rows were accepted
    CompletedData,
    /// A page body exceeded the payload limit
    AbortedSizeLimit,
    /// A page body nested deeper than allowed
    AbortedDepthLimit,
    /// A page body was not valid JSON
    AbortedMalformed,
    /// A page held more records than one batch may
    AbortedBatchTooLarge,
    /// The transport halted the run
    AbortedTransport(Halt),
}

impl Termination {
    /// Natural end for a run that accepted `rows` rows
    pub fn completed(rows: usize) -> Self {
        if rows == 0 {
            Self::CompletedEmpty
        } else {
            Self::CompletedData
        }
    }

    /// True for the two natural endings
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::CompletedEmpty | Self::CompletedData)
    }

    /// True for every abort
    pub fn is_aborted(&self) -> bool {
        !self.is_completed()
    }

    /// The halt behind a transport abort
    pub fn halt(&self) -> Option<&Halt> {
        match self {
            Self::AbortedTransport(halt) => Some(halt),
            _ => None,
        }
    }

    /// The run stopped for a reason only a configuration change can fix
    pub fn is_fatal(&self) -> bool {
        self.halt().is_some_and(Halt::is_fatal)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompletedEmpty => write!(f, "completed_empty"),
            Self::CompletedData => write!(f, "completed_data"),
            Self::AbortedSizeLimit => write!(f, "aborted_size_limit"),
            Self::AbortedDepthLimit => write!(f, "aborted_depth_limit"),
            Self::AbortedMalformed => write!(f, "aborted_malformed"),
            Self::AbortedBatchTooLarge => write!(f, "aborted_batch_too_large"),
            Self::AbortedTransport(halt) => write!(f, "aborted_transport ({halt})"),
        }
    }
}

/// Counters from one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Pages the transport delivered
    pub pages_fetched: usize,
    /// Pages that reached record extraction
    pub pages_extracted: usize,
    /// Files or objects decoded
    pub sources_read: usize,
    /// Files or objects that could not be read or decoded
    pub sources_failed: usize,
    /// Candidate records before filtering
    pub records_extracted: usize,
    /// Records accepted into the dataset
    pub records_kept: usize,
    /// Records dropped by the schema filter
    pub records_dropped: usize,
    /// Run time in milliseconds
    pub duration_ms: u64,
}

impl IngestStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a delivered page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Count a page whose records were extracted
    pub fn add_extracted_page(&mut self, records: usize) {
        self.pages_extracted += 1;
        self.records_extracted += records;
    }

    /// Count a decoded file or object, its records and the rows kept
    pub fn add_source(&mut self, records: usize, kept: usize) {
        self.sources_read += 1;
        self.records_extracted += records;
        self.records_kept += kept;
        self.records_dropped += records.saturating_sub(kept);
    }

    /// Count a file or object that failed
    pub fn add_failed_source(&mut self) {
        self.sources_failed += 1;
    }

    /// Count the outcome of filtering one batch
    pub fn add_filtered(&mut self, kept: usize, dropped: usize) {
        self.records_kept += kept;
        self.records_dropped += dropped;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
