//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `RunPhase`: the phase a run is in (loading, expanding, extracting, done, reconciling)
//! - `ProgressState`: durable cursor and committed count for one search
//! - `ProgressTracker`: per-run bookkeeping and the continue/stop decision

mod phase;
mod progress;

// Re-export main types
pub use phase::RunPhase;
pub use progress::{ProgressState, ProgressTracker};
