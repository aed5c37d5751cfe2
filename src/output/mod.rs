//! Output module for run summaries, store statistics and exports
//!
//! This module handles:
//! - Printing the outcome of a run
//! - Loading and printing store statistics
//! - Exporting a run's records as JSON

mod export;
pub mod stats;

pub use export::{export_json, ExportDocument};
pub use stats::{load_statistics, print_report, print_statistics, HarvestStatistics};
