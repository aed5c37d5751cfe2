//! Reconciliation of a run's result list against the store

use crate::harvest::Business;
use crate::storage::{Storage, StorageResult};
use std::collections::HashSet;

/// What reconciliation changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records dropped from the end of an overlong list
    pub trimmed: usize,
    /// Records pulled from the store to close a gap
    pub topped_up: usize,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.trimmed == 0 && self.topped_up == 0
    }
}

/// Brings `records` to exactly `target` entries where the store allows
///
/// An overlong list keeps its first `target` entries in discovery order. A
/// short list is topped up with the search's most recently created stored
/// records whose identifiers are not already present. If the store cannot
/// supply enough, the list stays short.
///
/// Applying this twice with the same store state changes nothing the
/// second time.
pub fn reconcile<S>(
    store: &S,
    query: &str,
    location: &str,
    records: &mut Vec<Business>,
    target: usize,
) -> StorageResult<ReconcileSummary>
where
    S: Storage + ?Sized,
{
    let mut summary = ReconcileSummary::default();

    if records.len() > target {
        summary.trimmed = records.len() - target;
        records.truncate(target);
        tracing::info!("Trimmed {} surplus records", summary.trimmed);
        return Ok(summary);
    }

    if records.len() == target {
        return Ok(summary);
    }

    let mut present: HashSet<String> = records.iter().map(|r| r.identifier.clone()).collect();
    // Every in-memory record could be among the most recent ones, so look
    // that much further back.
    let limit = target + records.len();
    let stored = store.recent_businesses(query, location, limit)?;

    for business in stored {
        if records.len() >= target {
            break;
        }
        if present.insert(business.identifier.clone()) {
            records.push(business);
            summary.topped_up += 1;
        }
    }

    if summary.topped_up > 0 {
        tracing::info!("Topped up {} records from the store", summary.topped_up);
    }
    if records.len() < target {
        tracing::warn!(
            "Store could not close the gap: {} of {} records",
            records.len(),
            target
        );
    }

    Ok(summary)
}
