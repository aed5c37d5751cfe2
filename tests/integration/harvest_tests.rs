//! Integration tests for the harvest controller
//!
//! These tests drive whole runs against a scripted in-memory map page and
//! an SQLite store wrapper that can inject duplicates and write failures.

use async_trait::async_trait;
use places_harvest::browser::{DriverError, DriverResult, ElementHandle, PageDriver};
use places_harvest::config::{Config, SelectorConfig};
use places_harvest::harvest::{reconcile, ExhaustionReason};
use places_harvest::state::ProgressState;
use places_harvest::storage::{
    ProgressRecord, SessionRecord, SessionStatus, SqliteStorage, Storage, StorageError,
    StorageResult,
};
use places_harvest::{Business, HarvestReport, HarvestRequest, HarvestStatus, Harvester, StopReason};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const ORIGIN: &str = "https://www.google.com";

fn identifier(slug: &str) -> String {
    format!("{}/maps/place/{}", ORIGIN, slug)
}

// ===== Scripted map page =====

#[derive(Debug, Clone)]
struct Listing {
    slug: String,
    sponsored: bool,
    phone: Option<String>,
}

impl Listing {
    fn new(index: usize) -> Self {
        Self {
            slug: format!("biz-{}", index),
            sponsored: false,
            phone: Some(format!("(512) 555-{:04}", index)),
        }
    }

    fn identifier(&self) -> String {
        identifier(&self.slug)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum View {
    Blank,
    List,
    Detail(String),
}

/// Simulates the map service: a scrolling result list and one detail page
/// per listing
struct ScriptedDriver {
    selectors: SelectorConfig,
    listings: Vec<Listing>,
    rendered: usize,
    initial_render: usize,
    end_marker: bool,
    feed_missing: bool,
    failing: HashSet<String>,
    view: View,
    detail_visits: Vec<String>,
}

impl ScriptedDriver {
    fn new(count: usize) -> Self {
        Self {
            selectors: SelectorConfig::default(),
            listings: (0..count).map(Listing::new).collect(),
            rendered: 0,
            initial_render: 5,
            end_marker: true,
            feed_missing: false,
            failing: HashSet::new(),
            view: View::Blank,
            detail_visits: Vec::new(),
        }
    }

    fn listing(&self, url: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.identifier() == url)
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        if self.failing.contains(url) {
            return Err(DriverError::Timeout {
                operation: format!("navigate to {}", url),
                after: timeout,
            });
        }
        if url.contains("/maps/search/") {
            self.view = if self.feed_missing {
                View::Blank
            } else {
                View::List
            };
            self.rendered = self.initial_render.min(self.listings.len());
            return Ok(());
        }
        if self.listing(url).is_some() {
            self.detail_visits.push(url.to_string());
            self.view = View::Detail(url.to_string());
            return Ok(());
        }
        Err(DriverError::Navigation {
            url: url.to_string(),
            message: "unknown page".to_string(),
        })
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> DriverResult<()> {
        let present = match &self.view {
            View::List => selector == self.selectors.feed,
            View::Detail(_) => selector == self.selectors.detail_ready,
            View::Blank => false,
        };
        if present {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(selector.to_string()))
        }
    }

    async fn read_text(&mut self, selector: &str) -> Option<String> {
        let View::Detail(url) = &self.view else {
            return None;
        };
        let listing = self.listing(url)?;
        let s = &self.selectors;

        if selector == s.name {
            Some(format!("Business {}", listing.slug))
        } else if selector == s.address {
            Some(format!("{} Congress Ave, Austin, TX", listing.slug.len()))
        } else if selector == s.phone {
            listing.phone.clone()
        } else if selector == s.rating {
            Some("4.5".to_string())
        } else {
            None
        }
    }

    async fn read_attribute(&mut self, _selector: &str, _name: &str) -> Option<String> {
        None
    }

    async fn scroll_container(&mut self, selector: &str, delta: i64) -> DriverResult<bool> {
        if self.view != View::List || selector != self.selectors.feed {
            return Ok(false);
        }
        let step = (delta / 150).max(1) as usize;
        self.rendered = (self.rendered + step).min(self.listings.len());
        Ok(true)
    }

    async fn list_elements(&mut self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        if self.view != View::List {
            return Ok(Vec::new());
        }
        if selector == self.selectors.end_of_list {
            let at_end = self.end_marker && self.rendered == self.listings.len();
            return Ok(if at_end {
                vec![ElementHandle::new().with_text("You've reached the end of the list.")]
            } else {
                Vec::new()
            });
        }
        if selector == self.selectors.result_link {
            return Ok(self.listings[..self.rendered]
                .iter()
                .map(|l| {
                    let label = if l.sponsored {
                        format!("Business {}\nSponsored", l.slug)
                    } else {
                        format!("Business {}\n4.5 (120)", l.slug)
                    };
                    ElementHandle::new()
                        .with_attribute("href", &format!("/maps/place/{}?authuser=0&hl=en", l.slug))
                        .with_ancestor_text(&label)
                })
                .collect());
        }
        Ok(Vec::new())
    }
}

// ===== Store wrapper with injected faults =====

/// Delegates to SQLite, optionally faking duplicates, racing writers and
/// write failures
struct FlakyStore {
    inner: SqliteStorage,
    /// Reported as duplicates without being written
    fake_duplicates: HashSet<String>,
    /// Written by a concurrent writer just before our insert lands
    racing: HashSet<String>,
    /// Every insert fails
    fail_always: HashSet<String>,
    /// The first N inserts fail
    fail_first: HashMap<String, u32>,
    insert_calls: HashMap<String, u32>,
}

impl FlakyStore {
    fn new() -> Self {
        Self::wrap(SqliteStorage::open_in_memory().unwrap())
    }

    fn wrap(inner: SqliteStorage) -> Self {
        Self {
            inner,
            fake_duplicates: HashSet::new(),
            racing: HashSet::new(),
            fail_always: HashSet::new(),
            fail_first: HashMap::new(),
            insert_calls: HashMap::new(),
        }
    }
}

impl Storage for FlakyStore {
    fn create_session(
        &mut self,
        query: &str,
        location: &str,
        target: usize,
        config_hash: &str,
    ) -> StorageResult<i64> {
        self.inner
            .create_session(query, location, target, config_hash)
    }

    fn finish_session(
        &mut self,
        session_id: i64,
        status: SessionStatus,
        achieved: usize,
    ) -> StorageResult<()> {
        self.inner.finish_session(session_id, status, achieved)
    }

    fn get_session(&self, session_id: i64) -> StorageResult<SessionRecord> {
        self.inner.get_session(session_id)
    }

    fn get_latest_session(&self) -> StorageResult<Option<SessionRecord>> {
        self.inner.get_latest_session()
    }

    fn running_sessions(&self, query: &str, location: &str) -> StorageResult<Vec<SessionRecord>> {
        self.inner.running_sessions(query, location)
    }

    fn load_progress(&self, query: &str, location: &str) -> StorageResult<Option<ProgressRecord>> {
        self.inner.load_progress(query, location)
    }

    fn save_progress(
        &mut self,
        query: &str,
        location: &str,
        state: ProgressState,
    ) -> StorageResult<()> {
        self.inner.save_progress(query, location, state)
    }

    fn list_progress(&self) -> StorageResult<Vec<ProgressRecord>> {
        self.inner.list_progress()
    }

    fn insert_business(
        &mut self,
        session_id: i64,
        query: &str,
        location: &str,
        business: &Business,
    ) -> StorageResult<i64> {
        let id = business.identifier.clone();
        let calls = self.insert_calls.entry(id.clone()).or_insert(0);
        *calls += 1;
        let calls = *calls;

        if self.fake_duplicates.contains(&id) {
            return Err(StorageError::ConstraintViolation(id));
        }
        if self.fail_always.contains(&id) {
            return Err(StorageError::Database("disk I/O error".to_string()));
        }
        if self.fail_first.get(&id).is_some_and(|&n| calls <= n) {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        if self.racing.remove(&id) {
            let other = self.inner.create_session(query, location, 1, "other")?;
            self.inner.insert_business(other, query, location, business)?;
        }
        self.inner
            .insert_business(session_id, query, location, business)
    }

    fn known_identifiers(&self) -> StorageResult<HashSet<String>> {
        self.inner.known_identifiers()
    }

    fn recent_businesses(
        &self,
        query: &str,
        location: &str,
        limit: usize,
    ) -> StorageResult<Vec<Business>> {
        self.inner.recent_businesses(query, location, limit)
    }

    fn count_businesses(&self) -> StorageResult<u64> {
        self.inner.count_businesses()
    }

    fn count_sessions_by_status(&self, status: SessionStatus) -> StorageResult<u64> {
        self.inner.count_sessions_by_status(status)
    }
}

// ===== Helpers =====

fn test_config() -> Config {
    let mut config = Config::with_database(":memory:");
    config.harvest.scroll_pause_ms = 0;
    config.harvest.backoff_base_ms = 0;
    config.harvest.list_wait_ms = 0;
    config
}

async fn run_harvest(
    harvester: &mut Harvester<ScriptedDriver, FlakyStore>,
    request: &HarvestRequest,
) -> (HarvestReport, Vec<u8>) {
    let mut percents = Vec::new();
    let report = harvester
        .run(request, &mut |percent, _records| percents.push(percent))
        .await;
    (report, percents)
}

fn harvester(driver: ScriptedDriver, store: FlakyStore) -> Harvester<ScriptedDriver, FlakyStore> {
    Harvester::new(driver, store, test_config()).with_config_hash("test-hash")
}

fn slugs(records: &[Business]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.identifier.trim_start_matches(&identifier("")).to_string())
        .collect()
}

fn assert_distinct(records: &[Business]) {
    let unique: HashSet<_> = records.iter().map(|r| r.identifier.as_str()).collect();
    assert_eq!(unique.len(), records.len(), "duplicate identifiers in result");
}

// ===== Scenarios =====

#[tokio::test]
async fn test_exact_fit_reports_rounded_percentages() {
    let mut harvester = harvester(ScriptedDriver::new(8), FlakyStore::new());
    let request = HarvestRequest::new("dentists", "Austin, TX", 8);

    let (report, percents) = run_harvest(&mut harvester, &request).await;

    assert_eq!(percents, vec![13, 25, 38, 50, 63, 75, 88, 100]);
    assert_eq!(report.records.len(), 8);
    assert_eq!(report.status, HarvestStatus::Complete);
    assert_eq!(report.stop_reason, StopReason::TargetMet);
    assert_eq!(report.cursor, 8);
    assert!(report.reconciliation.is_noop());
    assert_distinct(&report.records);

    let first = &report.records[0];
    assert_eq!(first.identifier, identifier("biz-0"));
    assert_eq!(first.phone, "+15125550000");
    assert_eq!(first.rating, Some(4.5));

    let store = harvester.store();
    assert_eq!(store.count_businesses().unwrap(), 8);
    let session = store.get_latest_session().unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.achieved, 8);
    assert_eq!(session.config_hash, "test-hash");
}

#[tokio::test]
async fn test_shortfall_when_source_exhausted() {
    let mut harvester = harvester(ScriptedDriver::new(5), FlakyStore::new());
    let request = HarvestRequest::new("dentists", "Austin, TX", 12);

    let (report, percents) = run_harvest(&mut harvester, &request).await;

    assert_eq!(report.records.len(), 5);
    assert_eq!(
        report.status,
        HarvestStatus::Shortfall {
            achieved: 5,
            requested: 12
        }
    );
    assert_eq!(
        report.stop_reason,
        StopReason::Exhausted(ExhaustionReason::EndOfList)
    );
    assert!(report.records.iter().all(|r| !r.phone.is_empty()));
    assert_eq!(percents.last(), Some(&42));

    let session = harvester.store().get_latest_session().unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Shortfall);
    assert_eq!(session.achieved, 5);
}

#[tokio::test]
async fn test_overshoot_is_trimmed_in_discovery_order() {
    let mut store = SqliteStorage::open_in_memory().unwrap();
    let session = store.create_session("dentists", "Austin, TX", 8, "hash").unwrap();

    let mut records = Vec::new();
    for i in 0..9 {
        let business = Business {
            identifier: identifier(&format!("biz-{}", i)),
            name: format!("Business {}", i),
            address: "1 Congress Ave".to_string(),
            phone: "+15125550100".to_string(),
            ..Default::default()
        };
        store
            .insert_business(session, "dentists", "Austin, TX", &business)
            .unwrap();
        records.push(business);
    }

    let summary = reconcile(&store, "dentists", "Austin, TX", &mut records, 8).unwrap();

    assert_eq!(summary.trimmed, 1);
    assert_eq!(records.len(), 8);
    assert_eq!(records[0].name, "Business 0");
    assert_eq!(records[7].name, "Business 7");

    // A second pass changes nothing
    let again = reconcile(&store, "dentists", "Austin, TX", &mut records, 8).unwrap();
    assert!(again.is_noop());
    assert_eq!(records.len(), 8);
}

#[tokio::test]
async fn test_navigation_fault_mid_run_is_skipped() {
    let mut driver = ScriptedDriver::new(10);
    driver.failing.insert(identifier("biz-4"));
    let mut harvester = harvester(driver, FlakyStore::new());
    let request = HarvestRequest::new("dentists", "Austin, TX", 9);

    let (report, _) = run_harvest(&mut harvester, &request).await;

    assert_eq!(report.records.len(), 9);
    assert!(report.is_complete());
    assert_eq!(report.stats.navigation_failures, 1);
    assert_eq!(report.stats.recoveries_failed, 0);
    assert!(!slugs(&report.records).contains(&"biz-4".to_string()));
    assert_eq!(
        slugs(&report.records)[4..],
        ["biz-5", "biz-6", "biz-7", "biz-8", "biz-9"]
    );
    assert_eq!(report.cursor, 10);
}

// ===== Properties =====

#[tokio::test]
async fn test_known_identifiers_are_never_extracted() {
    let mut inner = SqliteStorage::open_in_memory().unwrap();
    let earlier = inner.create_session("cafes", "Paris", 2, "hash").unwrap();
    for slug in ["biz-0", "biz-1"] {
        let business = Business {
            identifier: identifier(slug),
            name: slug.to_string(),
            address: "Rue de Rivoli".to_string(),
            phone: "+33140000000".to_string(),
            ..Default::default()
        };
        inner
            .insert_business(earlier, "cafes", "Paris", &business)
            .unwrap();
    }

    let mut driver = ScriptedDriver::new(8);
    // The same place linked twice in the list
    let repeat = driver.listings[2].clone();
    driver.listings.insert(3, repeat);
    let mut harvester = harvester(driver, FlakyStore::wrap(inner));
    let request = HarvestRequest::new("dentists", "Austin, TX", 4);

    let (report, _) = run_harvest(&mut harvester, &request).await;

    assert_eq!(slugs(&report.records), vec!["biz-2", "biz-3", "biz-4", "biz-5"]);
    assert_distinct(&report.records);
    assert_eq!(report.stats.duplicates_skipped, 2);

    let (driver, _) = harvester.into_parts();
    assert!(!driver.detail_visits.contains(&identifier("biz-0")));
    assert!(!driver.detail_visits.contains(&identifier("biz-1")));
    let visits_to_2 = driver
        .detail_visits
        .iter()
        .filter(|v| **v == identifier("biz-2"))
        .count();
    assert_eq!(visits_to_2, 1);
}

#[tokio::test]
async fn test_duplicate_insert_counts_as_progress() {
    let mut store = FlakyStore::new();
    store.fake_duplicates.insert(identifier("biz-2"));
    let mut harvester = harvester(ScriptedDriver::new(6), store);
    let request = HarvestRequest::new("dentists", "Austin, TX", 4);

    let (report, percents) = run_harvest(&mut harvester, &request).await;

    // Four commits' worth of progress, one of them a duplicate
    assert_eq!(percents, vec![25, 50, 75, 100]);
    assert_eq!(report.stop_reason, StopReason::TargetMet);
    assert_eq!(report.stats.committed, 3);
    assert_eq!(report.stats.duplicates_committed, 1);
    assert_eq!(report.cursor, 4);
    assert_eq!(slugs(&report.records), vec!["biz-0", "biz-1", "biz-3"]);
    assert_eq!(
        harvester.store().insert_calls.get(&identifier("biz-2")),
        Some(&1)
    );
}

#[tokio::test]
async fn test_racing_writer_duplicate_is_topped_up_once() {
    let mut store = FlakyStore::new();
    store.racing.insert(identifier("biz-1"));
    let mut harvester = harvester(ScriptedDriver::new(6), store);
    let request = HarvestRequest::new("dentists", "Austin, TX", 4);

    let (report, percents) = run_harvest(&mut harvester, &request).await;

    assert_eq!(percents, vec![25, 50, 75, 100]);
    assert_eq!(report.stats.duplicates_committed, 1);
    assert_eq!(report.reconciliation.topped_up, 1);
    assert_eq!(report.records.len(), 4);
    assert!(report.is_complete());
    assert_distinct(&report.records);

    let copies = report
        .records
        .iter()
        .filter(|r| r.identifier == identifier("biz-1"))
        .count();
    assert_eq!(copies, 1);
}

#[tokio::test]
async fn test_cursor_moves_forward_across_runs() {
    let mut harvester = harvester(ScriptedDriver::new(10), FlakyStore::new());

    let first = HarvestRequest::new("dentists", "Austin, TX", 3);
    let (report, _) = run_harvest(&mut harvester, &first).await;
    assert_eq!(report.start_cursor, 0);
    assert_eq!(report.cursor, 3);

    let progress = harvester
        .store()
        .load_progress("dentists", "Austin, TX")
        .unwrap()
        .unwrap();
    assert_eq!(progress.cursor, 3);
    assert_eq!(progress.committed_count, 3);

    let (report, _) = run_harvest(&mut harvester, &first).await;
    assert_eq!(report.start_cursor, 3);
    assert_eq!(report.cursor, 6);
    assert!(report.cursor >= report.start_cursor);
    assert_eq!(slugs(&report.records), vec!["biz-3", "biz-4", "biz-5"]);
    assert_eq!(report.stats.duplicates_skipped, 0);

    // A fresh scan starts at the top but still skips everything stored
    let fresh = HarvestRequest::new("dentists", "Austin, TX", 2).fresh(true);
    let (report, _) = run_harvest(&mut harvester, &fresh).await;
    assert_eq!(report.start_cursor, 0);
    assert_eq!(report.stats.duplicates_skipped, 6);
    assert_eq!(slugs(&report.records), vec!["biz-6", "biz-7"]);

    let progress = harvester
        .store()
        .load_progress("dentists", "Austin, TX")
        .unwrap()
        .unwrap();
    assert_eq!(progress.cursor, 8);
    assert_eq!(progress.committed_count, 8);
}

// ===== Edge cases =====

#[tokio::test]
async fn test_commit_failures_are_dropped_and_retried() {
    let mut store = FlakyStore::new();
    store.fail_always.insert(identifier("biz-1"));
    store.fail_first.insert(identifier("biz-2"), 2);
    let mut harvester = harvester(ScriptedDriver::new(6), store);
    let request = HarvestRequest::new("dentists", "Austin, TX", 3);

    let (report, percents) = run_harvest(&mut harvester, &request).await;

    assert_eq!(slugs(&report.records), vec!["biz-0", "biz-2", "biz-3"]);
    assert_eq!(report.stats.commit_failures, 1);
    assert_eq!(percents, vec![33, 67, 100]);

    let calls = &harvester.store().insert_calls;
    assert_eq!(calls.get(&identifier("biz-1")), Some(&3));
    assert_eq!(calls.get(&identifier("biz-2")), Some(&3));
}

#[tokio::test]
async fn test_incomplete_and_sponsored_entries_are_skipped() {
    let mut driver = ScriptedDriver::new(6);
    driver.listings[1].phone = None;
    driver.listings[3].sponsored = true;
    let mut harvester = harvester(driver, FlakyStore::new());
    let request = HarvestRequest::new("dentists", "Austin, TX", 3);

    let (report, _) = run_harvest(&mut harvester, &request).await;

    assert_eq!(slugs(&report.records), vec!["biz-0", "biz-2", "biz-4"]);
    assert_eq!(report.stats.incomplete, 1);

    let (driver, _) = harvester.into_parts();
    assert!(!driver.detail_visits.contains(&identifier("biz-3")));
}

#[tokio::test]
async fn test_missing_result_list_is_shortfall_not_fault() {
    let mut driver = ScriptedDriver::new(6);
    driver.feed_missing = true;
    let mut harvester = harvester(driver, FlakyStore::new());
    let request = HarvestRequest::new("dentists", "Austin, TX", 3);

    let (report, percents) = run_harvest(&mut harvester, &request).await;

    assert!(report.records.is_empty());
    assert!(percents.is_empty());
    assert_eq!(
        report.stop_reason,
        StopReason::Exhausted(ExhaustionReason::ContainerMissing)
    );
    assert_eq!(
        report.status,
        HarvestStatus::Shortfall {
            achieved: 0,
            requested: 3
        }
    );
}

#[tokio::test]
async fn test_zero_target_is_complete_without_browsing() {
    let mut harvester = harvester(ScriptedDriver::new(3), FlakyStore::new());
    let request = HarvestRequest::new("dentists", "Austin, TX", 0);

    let (report, _) = run_harvest(&mut harvester, &request).await;

    assert!(report.is_complete());
    assert!(report.records.is_empty());
    assert_eq!(report.stop_reason, StopReason::TargetMet);

    let (driver, _) = harvester.into_parts();
    assert_eq!(driver.view, View::Blank);
}

#[tokio::test]
async fn test_invalid_request_is_reported_as_fault() {
    let mut harvester = harvester(ScriptedDriver::new(3), FlakyStore::new());
    let request = HarvestRequest::new("   ", "Austin, TX", 2);

    let (report, _) = run_harvest(&mut harvester, &request).await;

    assert!(matches!(report.stop_reason, StopReason::Fault(_)));
    assert!(report.records.is_empty());
    assert!(report.session_id.is_none());
    assert!(!report.is_complete());
}
