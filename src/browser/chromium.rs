//! Chromium-backed page driver
//!
//! Launches a Chrome/Chromium instance through the DevTools protocol and
//! exposes its single page as a [`PageDriver`].

use crate::browser::driver::{DriverError, DriverResult, ElementHandle, PageDriver};
use crate::config::BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshots every match of a selector along with its enclosing entry's text
const LIST_ELEMENTS_JS: &str = r#"
(() => Array.from(document.querySelectorAll(__SELECTOR__)).map((el) => {
    const attributes = {};
    for (const attr of el.attributes) {
        attributes[attr.name] = attr.value;
    }
    const entry = el.closest('[role="article"]') || el.parentElement;
    return {
        attributes,
        text: (el.innerText || '').trim(),
        ancestorText: entry ? (entry.innerText || '').slice(0, 500) : '',
    };
}))()
"#;

const SCROLL_JS: &str = r#"
(() => {
    const el = document.querySelector(__SELECTOR__);
    if (!el) {
        return false;
    }
    el.scrollBy(0, __DELTA__);
    return true;
})()
"#;

/// Page driver over a launched Chromium instance
///
/// The CDP handler task is aborted when the driver is dropped.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    element_timeout: Duration,
}

impl ChromiumDriver {
    /// Launches a browser and opens a blank page
    pub async fn launch(settings: &BrowserSettings) -> DriverResult<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(settings.navigation_timeout_ms))
            .window_size(settings.window_width, settings.window_height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--mute-audio");

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        if let Some(user_agent) = &settings.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }

        let config = builder.build().map_err(DriverError::Launch)?;

        tracing::info!(headless = settings.headless, "Launching browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {:?}", e);
                }
            }
            tracing::debug!("Browser event handler finished");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(format!("Failed to open page: {}", e)))?;

        Ok(Self {
            browser,
            page,
            handler,
            element_timeout: Duration::from_millis(settings.element_timeout_ms),
        })
    }

    /// Closes the browser and waits for the process to exit
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Failed to wait for browser exit: {}", e);
        }
    }

    async fn evaluate<T: DeserializeOwned>(&self, script: String) -> DriverResult<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .build()
            .map_err(DriverError::Script)?;

        let result = tokio::time::timeout(self.element_timeout, self.page.evaluate_expression(params))
            .await
            .map_err(|_| DriverError::Timeout {
                operation: "evaluate".to_string(),
                after: self.element_timeout,
            })?
            .map_err(|e| DriverError::Script(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| DriverError::Script(e.to_string()))
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Embeds a selector into a script as a JSON string literal
fn quote_selector(selector: &str) -> String {
    serde_json::Value::String(selector.to_string()).to_string()
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        tracing::trace!("Navigating to {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DriverError::Timeout {
                operation: format!("navigate to {}", url),
                after: timeout,
            }),
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let start = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                tracing::trace!("{} appeared after {:?}", selector, start.elapsed());
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::ElementNotFound(selector.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_text(&mut self, selector: &str) -> Option<String> {
        let lookup = async {
            let element = self.page.find_element(selector).await.ok()?;
            element.inner_text().await.ok().flatten()
        };

        tokio::time::timeout(self.element_timeout, lookup)
            .await
            .ok()
            .flatten()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    async fn read_attribute(&mut self, selector: &str, name: &str) -> Option<String> {
        let lookup = async {
            let element = self.page.find_element(selector).await.ok()?;
            element.attribute(name).await.ok().flatten()
        };

        tokio::time::timeout(self.element_timeout, lookup)
            .await
            .ok()
            .flatten()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    async fn scroll_container(&mut self, selector: &str, delta: i64) -> DriverResult<bool> {
        let script = SCROLL_JS
            .replace("__SELECTOR__", &quote_selector(selector))
            .replace("__DELTA__", &delta.to_string());
        self.evaluate(script).await
    }

    async fn list_elements(&mut self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        let script = LIST_ELEMENTS_JS.replace("__SELECTOR__", &quote_selector(selector));
        self.evaluate(script).await
    }
}
