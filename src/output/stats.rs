//! Statistics from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! store statistics and run summaries.

use crate::harvest::{HarvestReport, HarvestStatus};
use crate::storage::{ProgressRecord, SessionRecord, SessionStatus, Storage};
use crate::HarvestError;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored businesses
    pub total_businesses: u64,

    /// Count of sessions by status, zero counts omitted
    pub sessions_by_status: Vec<(SessionStatus, u64)>,

    /// Progress of every search, most recently updated first
    pub searches: Vec<ProgressRecord>,

    /// The most recent session, if any
    pub latest_session: Option<SessionRecord>,
}

impl HarvestStatistics {
    pub fn total_sessions(&self) -> u64 {
        self.sessions_by_status.iter().map(|(_, count)| count).sum()
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let total_businesses = storage.count_businesses()?;

    let mut sessions_by_status = Vec::new();
    for status in SessionStatus::all() {
        let count = storage.count_sessions_by_status(status)?;
        if count > 0 {
            sessions_by_status.push((status, count));
        }
    }

    let searches = storage.list_progress()?;
    let latest_session = storage.get_latest_session()?;

    Ok(HarvestStatistics {
        total_businesses,
        sessions_by_status,
        searches,
        latest_session,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Businesses stored: {}", stats.total_businesses);
    println!("  Sessions: {}", stats.total_sessions());
    for (status, count) in &stats.sessions_by_status {
        println!("    {}: {}", status.to_db_string(), count);
    }
    println!();

    if !stats.searches.is_empty() {
        println!("Searches ({}):", stats.searches.len());
        for search in &stats.searches {
            println!(
                "  - '{}' in '{}': {} committed, cursor {} (updated {})",
                search.query,
                search.location,
                search.committed_count,
                search.cursor,
                search.updated_at
            );
        }
        println!();
    }

    if let Some(session) = &stats.latest_session {
        println!(
            "Latest session: #{} '{}' in '{}', {} of {} ({})",
            session.id,
            session.query,
            session.location,
            session.achieved,
            session.target,
            session.status.to_db_string()
        );
    }
}

/// Prints the outcome of one run
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Summary ===\n");
    println!("  Search: '{}' in '{}'", report.query, report.location);
    match report.status {
        HarvestStatus::Complete => {
            println!("  Result: {} of {} records", report.achieved(), report.requested)
        }
        HarvestStatus::Shortfall {
            achieved,
            requested,
        } => println!(
            "  Result: SHORTFALL, {} of {} records",
            achieved, requested
        ),
    }
    println!("  Stopped: {}", report.stop_reason);
    println!("  Cursor: {} -> {}", report.start_cursor, report.cursor);
    println!();

    let stats = &report.stats;
    println!("Candidates:");
    println!("  Seen: {}", stats.candidates_seen);
    println!("  Already known: {}", stats.duplicates_skipped);
    println!("  Incomplete: {}", stats.incomplete);
    println!(
        "  Navigation failures: {} ({} recoveries failed)",
        stats.navigation_failures, stats.recoveries_failed
    );
    println!("  Committed: {}", stats.committed);
    println!("  Already stored: {}", stats.duplicates_committed);
    println!("  Commit failures: {}", stats.commit_failures);
    println!("  Scrolls: {}", stats.scroll_attempts);

    if !report.reconciliation.is_noop() {
        println!(
            "  Reconciled: {} trimmed, {} topped up from store",
            report.reconciliation.trimmed, report.reconciliation.topped_up
        );
    }
    println!("\nElapsed: {:.1}s", report.elapsed.as_secs_f64());
}
