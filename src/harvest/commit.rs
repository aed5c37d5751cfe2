//! Commit pipeline: durable insertion with bounded retry

use crate::harvest::retry::{retry_with_backoff, Attempt, BackoffPolicy, RetryOutcome};
use crate::harvest::Business;
use crate::storage::Storage;

/// Result of committing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The store already holds a record with this identifier
    Duplicate,
    /// Every attempt failed for a reason other than a duplicate
    Failed(String),
}

/// Where committed records are filed
#[derive(Debug, Clone, Copy)]
pub struct CommitScope<'a> {
    pub session_id: i64,
    pub query: &'a str,
    pub location: &'a str,
}

pub struct CommitPipeline {
    policy: BackoffPolicy,
}

impl CommitPipeline {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Inserts `business`, retrying transient store errors
    ///
    /// A uniqueness violation ends the attempt loop at once as `Duplicate`.
    pub async fn commit<S>(&self, store: &mut S, scope: CommitScope<'_>, business: &Business) -> CommitOutcome
    where
        S: Storage + ?Sized,
    {
        let outcome = retry_with_backoff(&self.policy, |attempt| {
            match store.insert_business(scope.session_id, scope.query, scope.location, business) {
                Ok(_) => Attempt::Success(()),
                Err(e) if e.is_duplicate() => Attempt::Duplicate,
                Err(e) => {
                    tracing::warn!(
                        "Insert of {} failed (attempt {}): {}",
                        business.identifier,
                        attempt,
                        e
                    );
                    Attempt::Retry(e.to_string())
                }
            }
        })
        .await;

        match outcome {
            RetryOutcome::Success(()) => CommitOutcome::Committed,
            RetryOutcome::Duplicate => CommitOutcome::Duplicate,
            RetryOutcome::Failed {
                attempts,
                last_error,
            } => CommitOutcome::Failed(format!(
                "gave up after {} attempts: {}",
                attempts, last_error
            )),
        }
    }
}
