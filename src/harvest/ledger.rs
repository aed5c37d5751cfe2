//! Deduplication ledger

use std::collections::HashSet;

/// Identifiers that must not be extracted again
///
/// `durably_known` is a snapshot of the store taken once at run start and is
/// never modified; `seen_this_run` grows as candidates are attempted.
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    durably_known: HashSet<String>,
    seen_this_run: HashSet<String>,
}

impl DedupLedger {
    pub fn new(durably_known: HashSet<String>) -> Self {
        Self {
            durably_known,
            seen_this_run: HashSet::new(),
        }
    }

    pub fn is_known(&self, identifier: &str) -> bool {
        self.durably_known.contains(identifier) || self.seen_this_run.contains(identifier)
    }

    pub fn mark_seen(&mut self, identifier: &str) {
        if !self.seen_this_run.contains(identifier) {
            self.seen_this_run.insert(identifier.to_string());
        }
    }

    pub fn durable_len(&self) -> usize {
        self.durably_known.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen_this_run.len()
    }
}
