use crate::state::RunPhase;
use crate::HarvestError;

/// Durable progress of one (query, location) search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    /// Records durably stored for this search across all runs
    pub committed_count: u64,

    /// Next unprocessed position in the candidate list
    pub cursor: usize,
}

/// Tracks a run's phase, cursor and commit count and decides when to stop
///
/// The cursor only moves forward and the committed count never decreases.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    phase: RunPhase,
    state: ProgressState,
    start_cursor: usize,
    target: usize,
    committed_this_run: usize,
}

impl ProgressTracker {
    /// Creates a tracker in the `Loading` phase
    pub fn new(target: usize) -> Self {
        Self {
            phase: RunPhase::Loading,
            state: ProgressState::default(),
            start_cursor: 0,
            target,
            committed_this_run: 0,
        }
    }

    /// Seeds the tracker from durable progress loaded at run start
    pub fn resume(&mut self, loaded: ProgressState) {
        self.state = loaded;
        self.start_cursor = loaded.cursor;
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Moves to `next`, rejecting transitions the run state machine forbids
    pub fn enter(&mut self, next: RunPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn start_cursor(&self) -> usize {
        self.start_cursor
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn committed_this_run(&self) -> usize {
        self.committed_this_run
    }

    pub fn committed_total(&self) -> u64 {
        self.state.committed_count
    }

    /// Commits still needed to meet the target
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.committed_this_run)
    }

    pub fn target_met(&self) -> bool {
        self.committed_this_run >= self.target
    }

    /// Marks every position up to and including `position` as consumed
    pub fn advance_past(&mut self, position: usize) {
        self.state.cursor = self.state.cursor.max(position + 1);
    }

    /// Counts one committed (or already-present) record
    pub fn record_commit(&mut self) {
        self.committed_this_run += 1;
        self.state.committed_count += 1;
    }

    /// Percentage of the target reached this run, rounded to the nearest integer
    pub fn percent(&self) -> u8 {
        if self.target == 0 {
            return 100;
        }
        let ratio = self.committed_this_run as f64 / self.target as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }

    pub fn snapshot(&self) -> ProgressState {
        self.state
    }
}
