//! Run requests and the uniform result returned from every exit path

use crate::harvest::{Business, ReconcileSummary};
use crate::HarvestError;
use std::fmt;
use std::time::Duration;

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub query: String,
    pub location: String,
    /// Number of records wanted from this run
    pub target: usize,
    /// Ignore the stored cursor and scan the list from the top
    pub fresh: bool,
}

impl HarvestRequest {
    pub fn new(query: impl Into<String>, location: impl Into<String>, target: usize) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            target,
            fresh: false,
        }
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.query.trim().is_empty() {
            return Err(HarvestError::InvalidRequest(
                "query cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether the requested count was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestStatus {
    Complete,
    Shortfall { achieved: usize, requested: usize },
}

impl HarvestStatus {
    pub fn from_counts(achieved: usize, requested: usize) -> Self {
        if achieved >= requested {
            Self::Complete
        } else {
            Self::Shortfall {
                achieved,
                requested,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for HarvestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Shortfall {
                achieved,
                requested,
            } => write!(f, "shortfall ({} of {})", achieved, requested),
        }
    }
}

/// Why the candidate source stopped producing entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionReason {
    /// The service rendered its end-of-list marker
    EndOfList,
    /// Several scrolls in a row produced nothing new
    Stalled,
    /// The scroll budget for the run ran out
    ScrollBudget,
    /// The result list could not be found on the page
    ContainerMissing,
}

impl fmt::Display for ExhaustionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EndOfList => "end of list",
            Self::Stalled => "list stalled",
            Self::ScrollBudget => "scroll budget exhausted",
            Self::ContainerMissing => "result list not found",
        };
        write!(f, "{}", s)
    }
}

/// Why the main loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    TargetMet,
    Exhausted(ExhaustionReason),
    /// A fault escaped the loop; the partial result is still returned
    Fault(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetMet => write!(f, "target met"),
            Self::Exhausted(reason) => write!(f, "source exhausted ({})", reason),
            Self::Fault(message) => write!(f, "fault: {}", message),
        }
    }
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Candidates taken from the source
    pub candidates_seen: usize,
    /// Candidates skipped because the ledger already knew them
    pub duplicates_skipped: usize,
    /// Candidates rejected for missing required fields
    pub incomplete: usize,
    pub navigation_failures: usize,
    pub recoveries_failed: usize,
    pub committed: usize,
    /// Inserts the store reported as already present
    pub duplicates_committed: usize,
    pub commit_failures: usize,
    pub scroll_attempts: u32,
}

/// Result of one run, returned the same way on success, exhaustion and fault
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub query: String,
    pub location: String,
    pub requested: usize,
    pub records: Vec<Business>,
    /// Cursor at run start
    pub start_cursor: usize,
    /// Cursor at run end; never less than `start_cursor`
    pub cursor: usize,
    pub status: HarvestStatus,
    pub stop_reason: StopReason,
    pub stats: RunStats,
    pub reconciliation: ReconcileSummary,
    pub session_id: Option<i64>,
    pub elapsed: Duration,
}

impl HarvestReport {
    pub fn achieved(&self) -> usize {
        self.records.len()
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}
