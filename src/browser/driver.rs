//! Page driver capability
//!
//! The harvest core talks to the rendering substrate only through the
//! [`PageDriver`] trait. Every method is a suspension point and every
//! blocking wait is bounded by an explicit timeout.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser launch failed: {0}")]
    Launch(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// An owned snapshot of one element matched by [`PageDriver::list_elements`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementHandle {
    /// Attribute name to value
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// The element's own rendered text
    #[serde(default)]
    pub text: String,

    /// Rendered text of the enclosing entry, used for classification
    #[serde(default, rename = "ancestorText")]
    pub ancestor_text: String,
}

impl ElementHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_ancestor_text(mut self, text: &str) -> Self {
        self.ancestor_text = text.to_string();
        self
    }

    /// Returns an attribute value, or `None` when absent or blank
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// The browser automation capability used by the harvester
///
/// Implementations drive a single page; the harvester never issues two
/// calls concurrently.
#[async_trait]
pub trait PageDriver: Send {
    /// Loads `url` in the page, failing if it takes longer than `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Waits until `selector` matches at least one element
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Reads the trimmed text of the first match; `None` when absent or blank
    async fn read_text(&mut self, selector: &str) -> Option<String>;

    /// Reads an attribute of the first match; `None` when absent or blank
    async fn read_attribute(&mut self, selector: &str, name: &str) -> Option<String>;

    /// Scrolls the first match by `delta` pixels
    ///
    /// Returns `Ok(false)` when the container does not exist.
    async fn scroll_container(&mut self, selector: &str, delta: i64) -> DriverResult<bool>;

    /// Snapshots every element matching `selector`, in document order
    async fn list_elements(&mut self, selector: &str) -> DriverResult<Vec<ElementHandle>>;
}
