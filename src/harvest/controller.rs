//! Harvest controller - main run orchestration
//!
//! This module contains the main loop that coordinates one harvest run:
//! - Loading durable progress and the known-identifier snapshot
//! - Expanding the candidate source and extracting each candidate
//! - Committing records and persisting progress
//! - Reconciling the result list against the store

use crate::browser::PageDriver;
use crate::config::Config;
use crate::harvest::commit::{CommitOutcome, CommitPipeline, CommitScope};
use crate::harvest::extractor::RecordExtractor;
use crate::harvest::ledger::DedupLedger;
use crate::harvest::reconcile::{reconcile, ReconcileSummary};
use crate::harvest::retry::BackoffPolicy;
use crate::harvest::source::{Candidate, CandidateSource, SourceSettings, SourceStatus};
use crate::harvest::{
    Business, ExhaustionReason, HarvestReport, HarvestRequest, HarvestStatus, Rejection,
    RunStats, StopReason,
};
use crate::state::{ProgressState, ProgressTracker, RunPhase};
use crate::storage::{SessionStatus, Storage};
use crate::url::build_search_url;
use crate::HarvestError;
use std::time::Instant;

/// Progress callback: percent of target reached and the records so far
pub type ProgressCallback<'a> = dyn FnMut(u8, &[Business]) + 'a;

/// Drives harvest runs against an injected page driver and store
pub struct Harvester<D, S> {
    driver: D,
    store: S,
    config: Config,
    config_hash: String,
}

/// Mutable state of a single run
struct RunContext {
    session_id: Option<i64>,
    tracker: ProgressTracker,
    ledger: DedupLedger,
    records: Vec<Business>,
    stats: RunStats,
}

/// The per-run components the main loop feeds candidates through
struct Stages {
    source: CandidateSource,
    extractor: RecordExtractor,
    pipeline: CommitPipeline,
}

impl<D: PageDriver, S: Storage> Harvester<D, S> {
    pub fn new(driver: D, store: S, config: Config) -> Self {
        Self {
            driver,
            store,
            config,
            config_hash: String::new(),
        }
    }

    /// Sets the configuration hash recorded on each session
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_parts(self) -> (D, S) {
        (self.driver, self.store)
    }

    /// Runs one harvest and always returns a report
    ///
    /// The report carries the records, the final cursor and whether the
    /// target was met. Faults are captured in `stop_reason` rather than
    /// returned as errors, so a partial result is never lost.
    pub async fn run(
        &mut self,
        request: &HarvestRequest,
        on_progress: &mut ProgressCallback<'_>,
    ) -> HarvestReport {
        let started = Instant::now();
        tracing::info!(
            "Starting harvest: '{}' in '{}' (target {})",
            request.query,
            request.location,
            request.target
        );

        let mut ctx = RunContext {
            session_id: None,
            tracker: ProgressTracker::new(request.target),
            ledger: DedupLedger::default(),
            records: Vec::new(),
            stats: RunStats::default(),
        };

        let stop_reason = match self.harvest(request, &mut ctx, on_progress).await {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!("Harvest stopped by fault: {}", e);
                StopReason::Fault(e.to_string())
            }
        };

        if ctx.tracker.phase().is_active() {
            enter_quietly(&mut ctx.tracker, RunPhase::Done);
        }
        if ctx.session_id.is_some() {
            self.persist_progress(request, &ctx.tracker);
        }

        enter_quietly(&mut ctx.tracker, RunPhase::Reconciling);
        let reconciliation = match reconcile(
            &self.store,
            &request.query,
            &request.location,
            &mut ctx.records,
            request.target,
        ) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Reconciliation read failed, keeping run results: {}", e);
                ReconcileSummary::default()
            }
        };

        let status = HarvestStatus::from_counts(ctx.records.len(), request.target);
        if let Some(session_id) = ctx.session_id {
            let session_status = match (&stop_reason, status) {
                (StopReason::Fault(_), _) => SessionStatus::Failed,
                (_, HarvestStatus::Complete) => SessionStatus::Completed,
                (_, HarvestStatus::Shortfall { .. }) => SessionStatus::Shortfall,
            };
            if let Err(e) =
                self.store
                    .finish_session(session_id, session_status, ctx.records.len())
            {
                tracing::warn!("Failed to finish session {}: {}", session_id, e);
            }
        }

        let elapsed = started.elapsed();
        tracing::info!(
            "Harvest finished: {} ({}) in {:?}",
            status,
            stop_reason,
            elapsed
        );

        HarvestReport {
            query: request.query.clone(),
            location: request.location.clone(),
            requested: request.target,
            records: ctx.records,
            start_cursor: ctx.tracker.start_cursor(),
            cursor: ctx.tracker.cursor(),
            status,
            stop_reason,
            stats: ctx.stats,
            reconciliation,
            session_id: ctx.session_id,
            elapsed,
        }
    }

    /// The main loop; every `Ok` is a normal stop, every `Err` a fault
    async fn harvest(
        &mut self,
        request: &HarvestRequest,
        ctx: &mut RunContext,
        on_progress: &mut ProgressCallback<'_>,
    ) -> Result<StopReason, HarvestError> {
        request.validate()?;
        self.load(request, ctx)?;

        if ctx.tracker.target_met() {
            ctx.tracker.enter(RunPhase::Done)?;
            return Ok(StopReason::TargetMet);
        }

        let search_url = build_search_url(
            &self.config.search.base_url,
            &request.query,
            &request.location,
        )?;
        tracing::debug!("Search URL: {}", search_url);

        let mut stages = Stages {
            source: CandidateSource::new(search_url, SourceSettings::from_config(&self.config)),
            extractor: RecordExtractor::new(&self.config),
            pipeline: CommitPipeline::new(BackoffPolicy::from_config(&self.config.harvest)),
        };

        loop {
            ctx.tracker.enter(RunPhase::Expanding)?;
            let wanted = ctx.tracker.remaining() + self.config.harvest.lookahead;
            let batch = stages
                .source
                .next(&mut self.driver, ctx.tracker.cursor(), wanted)
                .await;
            ctx.stats.scroll_attempts = stages.source.scroll_attempts();

            if batch.candidates.is_empty() {
                let reason = match batch.status {
                    SourceStatus::Exhausted(reason) => reason,
                    SourceStatus::Open => ExhaustionReason::Stalled,
                };
                ctx.tracker.enter(RunPhase::Done)?;
                return Ok(StopReason::Exhausted(reason));
            }

            ctx.tracker.enter(RunPhase::Extracting)?;
            tracing::debug!(
                "Processing {} candidates from position {}",
                batch.candidates.len(),
                ctx.tracker.cursor()
            );

            for candidate in batch.candidates {
                let position = candidate.position;
                self.process_candidate(request, ctx, &mut stages, candidate, on_progress)
                    .await;
                ctx.tracker.advance_past(position);

                if ctx.tracker.target_met() {
                    ctx.tracker.enter(RunPhase::Done)?;
                    return Ok(StopReason::TargetMet);
                }
            }

            self.persist_progress(request, &ctx.tracker);

            if let SourceStatus::Exhausted(reason) = batch.status {
                ctx.tracker.enter(RunPhase::Done)?;
                return Ok(StopReason::Exhausted(reason));
            }
        }
    }

    /// Opens a session and seeds the tracker and ledger from the store
    fn load(&mut self, request: &HarvestRequest, ctx: &mut RunContext) -> Result<(), HarvestError> {
        let (query, location) = (request.query.as_str(), request.location.as_str());

        for session in self.store.running_sessions(query, location)? {
            tracing::warn!(
                "Session {} for this search (started {}) is still marked running",
                session.id,
                session.started_at
            );
        }

        let session_id =
            self.store
                .create_session(query, location, request.target, &self.config_hash)?;
        ctx.session_id = Some(session_id);

        let stored = self.store.load_progress(query, location)?;
        let loaded = ProgressState {
            committed_count: stored.as_ref().map_or(0, |p| p.committed_count),
            cursor: match &stored {
                Some(_) if request.fresh => 0,
                Some(p) => p.cursor as usize,
                None => 0,
            },
        };
        ctx.tracker.resume(loaded);

        ctx.ledger = DedupLedger::new(self.store.known_identifiers()?);

        tracing::info!(
            "Session {}: resuming at position {} ({} committed previously, {} known identifiers)",
            session_id,
            loaded.cursor,
            loaded.committed_count,
            ctx.ledger.durable_len()
        );
        Ok(())
    }

    /// Ledger check, extraction and commit for one candidate
    ///
    /// Never fails: every outcome is logged and counted, and the caller
    /// advances the cursor past the candidate regardless.
    async fn process_candidate(
        &mut self,
        request: &HarvestRequest,
        ctx: &mut RunContext,
        stages: &mut Stages,
        candidate: Candidate,
        on_progress: &mut ProgressCallback<'_>,
    ) {
        ctx.stats.candidates_seen += 1;

        if ctx.ledger.is_known(&candidate.identifier) {
            tracing::debug!("Skipping known {}", candidate.identifier);
            ctx.stats.duplicates_skipped += 1;
            return;
        }
        ctx.ledger.mark_seen(&candidate.identifier);

        let business = match stages.extractor.extract(&mut self.driver, &candidate).await {
            Ok(business) => business,
            Err(Rejection::IncompleteData { missing }) => {
                tracing::debug!(
                    "Skipping {} at position {}: missing {}",
                    candidate.identifier,
                    candidate.position,
                    missing.join(", ")
                );
                ctx.stats.incomplete += 1;
                return;
            }
            Err(Rejection::NavigationFailure(message)) => {
                tracing::warn!(
                    "Navigation failed at position {} ({}): {}",
                    candidate.position,
                    candidate.identifier,
                    message
                );
                ctx.stats.navigation_failures += 1;
                if !stages
                    .source
                    .recover(&mut self.driver, candidate.position)
                    .await
                {
                    tracing::warn!("Recovery after position {} failed", candidate.position);
                    ctx.stats.recoveries_failed += 1;
                }
                return;
            }
        };

        let Some(session_id) = ctx.session_id else {
            return;
        };
        let scope = CommitScope {
            session_id,
            query: &request.query,
            location: &request.location,
        };

        match stages
            .pipeline
            .commit(&mut self.store, scope, &business)
            .await
        {
            CommitOutcome::Committed => {
                tracing::debug!("Committed {} ({})", business.name, business.identifier);
                ctx.records.push(business);
                ctx.stats.committed += 1;
                ctx.tracker.record_commit();
                on_progress(ctx.tracker.percent(), &ctx.records);
                self.persist_progress(request, &ctx.tracker);
            }
            CommitOutcome::Duplicate => {
                tracing::debug!("{} already stored, counting as progress", business.identifier);
                ctx.stats.duplicates_committed += 1;
                ctx.tracker.record_commit();
                on_progress(ctx.tracker.percent(), &ctx.records);
                self.persist_progress(request, &ctx.tracker);
            }
            CommitOutcome::Failed(message) => {
                tracing::error!("Dropping {}: {}", business.identifier, message);
                ctx.stats.commit_failures += 1;
            }
        }
    }

    /// Best-effort save of cursor and committed count
    fn persist_progress(&mut self, request: &HarvestRequest, tracker: &ProgressTracker) {
        if let Err(e) =
            self.store
                .save_progress(&request.query, &request.location, tracker.snapshot())
        {
            tracing::warn!("Failed to save progress: {}", e);
        }
    }
}

fn enter_quietly(tracker: &mut ProgressTracker, phase: RunPhase) {
    if let Err(e) = tracker.enter(phase) {
        tracing::warn!("{}", e);
    }
}
