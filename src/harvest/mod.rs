//! Harvest module: the incremental extraction-and-reconciliation core
//!
//! A run flows through these components, leaves first:
//! - `DedupLedger`: identifiers already stored or attempted this run
//! - `CandidateSource`: the lazily scrolled result list
//! - `RecordExtractor`: one candidate to one validated record or rejection
//! - `CommitPipeline`: durable insertion with bounded retry
//! - `Harvester`: the main loop and progress reporting
//! - `reconcile`: final adjustment of the result list against the store

mod commit;
mod controller;
mod extractor;
mod ledger;
mod reconcile;
mod record;
mod report;
mod retry;
mod source;

pub use commit::{CommitOutcome, CommitPipeline, CommitScope};
pub use controller::{Harvester, ProgressCallback};
pub use extractor::RecordExtractor;
pub use ledger::DedupLedger;
pub use reconcile::{reconcile, ReconcileSummary};
pub use record::{Business, BusinessDraft, Rejection};
pub use report::{
    ExhaustionReason, HarvestReport, HarvestRequest, HarvestStatus, RunStats, StopReason,
};
pub use retry::{retry_with_backoff, Attempt, BackoffPolicy, RetryOutcome};
pub use source::{Candidate, CandidateBatch, CandidateSource, SourceSettings, SourceStatus};
