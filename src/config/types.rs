use serde::Deserialize;

/// Main configuration structure for Places-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
}

/// Where searches are issued
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Base URL that "<query> in <location>" is appended to as a path segment
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

/// Browser launch and timeout settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Path to a Chrome/Chromium executable (auto-detected when absent)
    #[serde(default)]
    pub executable: Option<String>,

    /// Overrides the browser's user agent string
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,

    #[serde(rename = "window-width", default = "default_window_width")]
    pub window_width: u32,

    #[serde(rename = "window-height", default = "default_window_height")]
    pub window_height: u32,

    /// Upper bound for a single navigation (milliseconds)
    #[serde(
        rename = "navigation-timeout-ms",
        default = "default_navigation_timeout_ms"
    )]
    pub navigation_timeout_ms: u64,

    /// Upper bound for waiting on a selector (milliseconds)
    #[serde(rename = "element-timeout-ms", default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,
}

/// Harvest loop tuning
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Total scrolls the candidate source may issue during one run
    #[serde(
        rename = "max-scroll-attempts",
        default = "default_max_scroll_attempts"
    )]
    pub max_scroll_attempts: u32,

    /// Consecutive scrolls without new entries before the list counts as stalled
    #[serde(rename = "stall-window", default = "default_stall_window")]
    pub stall_window: u32,

    /// Extra candidates buffered beyond the remaining target
    #[serde(default = "default_lookahead")]
    pub lookahead: usize,

    /// Pixels scrolled per expansion step
    #[serde(rename = "scroll-delta", default = "default_scroll_delta")]
    pub scroll_delta: i64,

    /// Pause after each scroll so the list can render (milliseconds)
    #[serde(rename = "scroll-pause-ms", default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,

    /// Approximate rendered height of one list entry (pixels)
    #[serde(rename = "item-height", default = "default_item_height")]
    pub item_height: i64,

    /// Insert attempts per record before giving up
    #[serde(rename = "commit-attempts", default = "default_commit_attempts")]
    pub commit_attempts: u32,

    /// First backoff delay between insert attempts; doubles each retry (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Country calling code assumed for domestic numbers
    #[serde(
        rename = "default-country-code",
        default = "default_country_code"
    )]
    pub default_country_code: String,

    /// Short probe used to check whether the result list is still mounted (milliseconds)
    #[serde(rename = "list-wait-ms", default = "default_list_wait_ms")]
    pub list_wait_ms: u64,
}

/// CSS selectors for the map service's markup
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Scrollable results container
    #[serde(default = "default_feed")]
    pub feed: String,

    /// Anchor of each result entry
    #[serde(rename = "result-link", default = "default_result_link")]
    pub result_link: String,

    /// Marker shown once the list has no more entries
    #[serde(rename = "end-of-list", default = "default_end_of_list")]
    pub end_of_list: String,

    /// Present once a detail view has rendered
    #[serde(rename = "detail-ready", default = "default_detail_ready")]
    pub detail_ready: String,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_phone")]
    pub phone: String,

    #[serde(default = "default_website")]
    pub website: String,

    #[serde(default = "default_rating")]
    pub rating: String,

    #[serde(rename = "review-count", default = "default_review_count")]
    pub review_count: String,

    #[serde(default = "default_category")]
    pub category: String,

    /// Any outbound link inside the detail view
    #[serde(default = "default_links")]
    pub links: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Optional JSON file receiving each run's records
    #[serde(rename = "export-path", default)]
    pub export_path: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://www.google.com/maps/search/".to_string()
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_element_timeout_ms() -> u64 {
    10_000
}

fn default_max_scroll_attempts() -> u32 {
    60
}

fn default_stall_window() -> u32 {
    3
}

fn default_lookahead() -> usize {
    5
}

fn default_scroll_delta() -> i64 {
    2000
}

fn default_scroll_pause_ms() -> u64 {
    1500
}

fn default_item_height() -> i64 {
    150
}

fn default_commit_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_country_code() -> String {
    "1".to_string()
}

fn default_list_wait_ms() -> u64 {
    2000
}

fn default_feed() -> String {
    r#"div[role="feed"]"#.to_string()
}

fn default_result_link() -> String {
    r#"a[href*="/maps/place/"]"#.to_string()
}

fn default_end_of_list() -> String {
    "span.HlvSq".to_string()
}

fn default_detail_ready() -> String {
    "h1".to_string()
}

fn default_name() -> String {
    "h1".to_string()
}

fn default_address() -> String {
    r#"button[data-item-id="address"]"#.to_string()
}

fn default_phone() -> String {
    r#"button[data-item-id^="phone:tel:"]"#.to_string()
}

fn default_website() -> String {
    r#"a[data-item-id="authority"]"#.to_string()
}

fn default_rating() -> String {
    r#"div.F7nice span[aria-hidden="true"]"#.to_string()
}

fn default_review_count() -> String {
    r#"div.F7nice span[aria-label*="review"]"#.to_string()
}

fn default_category() -> String {
    r#"button[jsaction*="category"]"#.to_string()
}

fn default_links() -> String {
    r#"div[role="main"] a[href]"#.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_agent: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            element_timeout_ms: default_element_timeout_ms(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_scroll_attempts: default_max_scroll_attempts(),
            stall_window: default_stall_window(),
            lookahead: default_lookahead(),
            scroll_delta: default_scroll_delta(),
            scroll_pause_ms: default_scroll_pause_ms(),
            item_height: default_item_height(),
            commit_attempts: default_commit_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            default_country_code: default_country_code(),
            list_wait_ms: default_list_wait_ms(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            feed: default_feed(),
            result_link: default_result_link(),
            end_of_list: default_end_of_list(),
            detail_ready: default_detail_ready(),
            name: default_name(),
            address: default_address(),
            phone: default_phone(),
            website: default_website(),
            rating: default_rating(),
            review_count: default_review_count(),
            category: default_category(),
            links: default_links(),
        }
    }
}

impl Config {
    /// Builds a configuration with every section at its default, writing to `database_path`
    pub fn with_database(database_path: &str) -> Self {
        Self {
            search: SearchConfig::default(),
            browser: BrowserSettings::default(),
            harvest: HarvestConfig::default(),
            selectors: SelectorConfig::default(),
            output: OutputConfig {
                database_path: database_path.to_string(),
                export_path: None,
            },
        }
    }
}
