//! Candidate source over the scrolling result list
//!
//! The list is lazily expanded by scrolling its container and re-reading
//! every rendered result link. Identifiers are appended in first-seen order,
//! so a position always refers to the same entry for the lifetime of the
//! source.

use crate::browser::PageDriver;
use crate::config::Config;
use crate::fields::is_sponsored;
use crate::harvest::ExhaustionReason;
use crate::url::normalize_identifier;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// An unprocessed result list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub identifier: String,
    /// Index in the source's ordered list
    pub position: usize,
}

/// Whether the source can still grow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Open,
    Exhausted(ExhaustionReason),
}

/// Candidates returned by [`CandidateSource::next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
    /// `Exhausted` only once every buffered entry has been handed out
    pub status: SourceStatus,
}

/// Scroll and selector settings for the result list
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub feed_selector: String,
    pub link_selector: String,
    pub end_selector: String,
    pub max_scroll_attempts: u32,
    pub stall_window: u32,
    pub scroll_delta: i64,
    pub scroll_pause: Duration,
    pub item_height: i64,
    pub list_wait: Duration,
    pub navigation_timeout: Duration,
    pub element_timeout: Duration,
}

impl SourceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            feed_selector: config.selectors.feed.clone(),
            link_selector: config.selectors.result_link.clone(),
            end_selector: config.selectors.end_of_list.clone(),
            max_scroll_attempts: config.harvest.max_scroll_attempts,
            stall_window: config.harvest.stall_window,
            scroll_delta: config.harvest.scroll_delta,
            scroll_pause: Duration::from_millis(config.harvest.scroll_pause_ms),
            item_height: config.harvest.item_height,
            list_wait: Duration::from_millis(config.harvest.list_wait_ms),
            navigation_timeout: Duration::from_millis(config.browser.navigation_timeout_ms),
            element_timeout: Duration::from_millis(config.browser.element_timeout_ms),
        }
    }
}

/// Lazily expanding, ordered sequence of candidate identifiers
pub struct CandidateSource {
    search_url: Url,
    settings: SourceSettings,
    entries: Vec<String>,
    index: HashSet<String>,
    scroll_attempts: u32,
    stalled_scrolls: u32,
    sponsored_skipped: usize,
    exhausted: Option<ExhaustionReason>,
}

impl CandidateSource {
    pub fn new(search_url: Url, settings: SourceSettings) -> Self {
        Self {
            search_url,
            settings,
            entries: Vec::new(),
            index: HashSet::new(),
            scroll_attempts: 0,
            stalled_scrolls: 0,
            sponsored_skipped: 0,
            exhausted: None,
        }
    }

    /// Number of entries discovered so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scroll_attempts(&self) -> u32 {
        self.scroll_attempts
    }

    pub fn sponsored_skipped(&self) -> usize {
        self.sponsored_skipped
    }

    /// Returns up to `count` candidates starting at `cursor`
    ///
    /// Scrolls until `cursor + count` entries are known or expansion stops.
    /// A missing list container yields an exhausted batch, never an error.
    pub async fn next<D>(&mut self, driver: &mut D, cursor: usize, count: usize) -> CandidateBatch
    where
        D: PageDriver + ?Sized,
    {
        let wanted = cursor.saturating_add(count);

        if self.entries.len() < wanted && self.exhausted.is_none() {
            self.expand(driver, wanted).await;
        }

        let start = cursor.min(self.entries.len());
        let end = wanted.min(self.entries.len());
        let candidates = self.entries[start..end]
            .iter()
            .enumerate()
            .map(|(offset, identifier)| Candidate {
                identifier: identifier.clone(),
                position: start + offset,
            })
            .collect();

        let status = match self.exhausted {
            Some(reason) if end >= self.entries.len() => SourceStatus::Exhausted(reason),
            _ => SourceStatus::Open,
        };

        CandidateBatch { candidates, status }
    }

    /// Reopens the result list scrolled to roughly `position`
    ///
    /// Used after a navigation fault. Returns false if the list could not be
    /// brought back.
    pub async fn recover<D>(&mut self, driver: &mut D, position: usize) -> bool
    where
        D: PageDriver + ?Sized,
    {
        let offset = position as i64 * self.settings.item_height;
        tracing::debug!("Recovering result list at position {} ({}px)", position, offset);
        self.reopen(driver, offset).await
    }

    async fn expand<D>(&mut self, driver: &mut D, wanted: usize)
    where
        D: PageDriver + ?Sized,
    {
        if !self.ensure_list(driver).await {
            tracing::warn!("Result list not found for {}", self.search_url);
            self.exhausted = Some(ExhaustionReason::ContainerMissing);
            return;
        }

        self.refresh(driver).await;

        while self.entries.len() < wanted {
            if self.end_marker_visible(driver).await {
                self.finish(ExhaustionReason::EndOfList);
                return;
            }
            if self.stalled_scrolls >= self.settings.stall_window {
                self.finish(ExhaustionReason::Stalled);
                return;
            }
            if self.scroll_attempts >= self.settings.max_scroll_attempts {
                self.finish(ExhaustionReason::ScrollBudget);
                return;
            }

            self.scroll_attempts += 1;
            match driver
                .scroll_container(&self.settings.feed_selector, self.settings.scroll_delta)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    self.finish(ExhaustionReason::ContainerMissing);
                    return;
                }
                Err(e) => {
                    tracing::warn!("Scroll attempt {} failed: {}", self.scroll_attempts, e);
                }
            }

            tokio::time::sleep(self.settings.scroll_pause).await;

            if self.refresh(driver).await == 0 {
                self.stalled_scrolls += 1;
            } else {
                self.stalled_scrolls = 0;
            }
        }
    }

    fn finish(&mut self, reason: ExhaustionReason) {
        tracing::info!(
            "Candidate source exhausted after {} entries: {}",
            self.entries.len(),
            reason
        );
        self.exhausted = Some(reason);
    }

    /// Makes sure the result list is mounted, reopening it if a detail page
    /// replaced it
    async fn ensure_list<D>(&mut self, driver: &mut D) -> bool
    where
        D: PageDriver + ?Sized,
    {
        if driver
            .wait_for_selector(&self.settings.feed_selector, self.settings.list_wait)
            .await
            .is_ok()
        {
            return true;
        }

        let offset = self.entries.len() as i64 * self.settings.item_height;
        self.reopen(driver, offset).await
    }

    async fn reopen<D>(&mut self, driver: &mut D, offset: i64) -> bool
    where
        D: PageDriver + ?Sized,
    {
        if let Err(e) = driver
            .navigate(self.search_url.as_str(), self.settings.navigation_timeout)
            .await
        {
            tracing::warn!("Failed to open result list: {}", e);
            return false;
        }
        if let Err(e) = driver
            .wait_for_selector(&self.settings.feed_selector, self.settings.element_timeout)
            .await
        {
            tracing::warn!("Result list did not render: {}", e);
            return false;
        }

        if offset > 0 {
            match driver
                .scroll_container(&self.settings.feed_selector, offset)
                .await
            {
                Ok(true) => tokio::time::sleep(self.settings.scroll_pause).await,
                Ok(false) => return false,
                Err(e) => tracing::warn!("Failed to restore list offset {}px: {}", offset, e),
            }
        }

        true
    }

    /// Re-reads every rendered result link and appends unseen identifiers
    ///
    /// Returns the number of new entries.
    async fn refresh<D>(&mut self, driver: &mut D) -> usize
    where
        D: PageDriver + ?Sized,
    {
        let elements = match driver.list_elements(&self.settings.link_selector).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::warn!("Failed to read result list: {}", e);
                return 0;
            }
        };

        let before = self.entries.len();
        for element in &elements {
            let Some(href) = element.attribute("href") else {
                continue;
            };
            let identifier = match normalize_identifier(href, &self.search_url) {
                Ok(identifier) => identifier,
                Err(e) => {
                    tracing::trace!("Ignoring result link {}: {}", href, e);
                    continue;
                }
            };
            if self.index.contains(&identifier) {
                continue;
            }
            if is_sponsored(element) {
                tracing::debug!("Skipping sponsored entry {}", identifier);
                self.sponsored_skipped += 1;
                self.index.insert(identifier);
                continue;
            }
            self.index.insert(identifier.clone());
            self.entries.push(identifier);
        }

        let added = self.entries.len() - before;
        tracing::debug!(
            "Result list: {} rendered, {} new, {} total",
            elements.len(),
            added,
            self.entries.len()
        );
        added
    }

    async fn end_marker_visible<D>(&mut self, driver: &mut D) -> bool
    where
        D: PageDriver + ?Sized,
    {
        driver
            .list_elements(&self.settings.end_selector)
            .await
            .map(|markers| !markers.is_empty())
            .unwrap_or(false)
    }
}
