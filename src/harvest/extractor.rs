//! Record extraction from a candidate's detail page

use crate::browser::PageDriver;
use crate::config::{Config, SelectorConfig};
use crate::fields::{
    clean_address, clean_text, extract_email, normalize_phone, parse_rating, parse_review_count,
    phone_from_item_id, SocialLinks,
};
use crate::harvest::{Business, BusinessDraft, Candidate, Rejection};
use std::time::Duration;

/// Turns one candidate into a validated [`Business`] or a [`Rejection`]
///
/// Every field is read independently; a missing optional field leaves the
/// value empty. Navigation and render timeouts are reported as
/// `NavigationFailure` so the caller can recover the list view.
pub struct RecordExtractor {
    selectors: SelectorConfig,
    country_code: String,
    navigation_timeout: Duration,
    element_timeout: Duration,
}

impl RecordExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            selectors: config.selectors.clone(),
            country_code: config.harvest.default_country_code.clone(),
            navigation_timeout: Duration::from_millis(config.browser.navigation_timeout_ms),
            element_timeout: Duration::from_millis(config.browser.element_timeout_ms),
        }
    }

    pub async fn extract<D>(&self, driver: &mut D, candidate: &Candidate) -> Result<Business, Rejection>
    where
        D: PageDriver + ?Sized,
    {
        driver
            .navigate(&candidate.identifier, self.navigation_timeout)
            .await
            .map_err(|e| Rejection::NavigationFailure(e.to_string()))?;
        driver
            .wait_for_selector(&self.selectors.detail_ready, self.element_timeout)
            .await
            .map_err(|e| Rejection::NavigationFailure(e.to_string()))?;

        let mut draft = BusinessDraft::new(candidate.identifier.clone());

        draft.name = driver
            .read_text(&self.selectors.name)
            .await
            .map(|name| clean_text(&name));

        draft.address = match driver.read_text(&self.selectors.address).await {
            Some(text) => Some(clean_address(&text)),
            None => driver
                .read_attribute(&self.selectors.address, "aria-label")
                .await
                .map(|label| clean_address(&label)),
        };

        draft.phone = self.read_phone(driver).await;

        draft.website = driver
            .read_attribute(&self.selectors.website, "href")
            .await;
        draft.rating = driver
            .read_text(&self.selectors.rating)
            .await
            .and_then(|text| parse_rating(&text));
        draft.review_count = driver
            .read_text(&self.selectors.review_count)
            .await
            .and_then(|text| parse_review_count(&text));
        draft.category = driver
            .read_text(&self.selectors.category)
            .await
            .map(|text| clean_text(&text))
            .filter(|text| !text.is_empty());

        let hrefs = match driver.list_elements(&self.selectors.links).await {
            Ok(elements) => elements
                .iter()
                .filter_map(|e| e.attribute("href").map(str::to_string))
                .collect::<Vec<_>>(),
            Err(e) => {
                tracing::debug!("No links read from {}: {}", candidate.identifier, e);
                Vec::new()
            }
        };
        draft.social = SocialLinks::from_links(hrefs.iter().map(String::as_str));
        draft.email = hrefs
            .iter()
            .filter(|href| href.starts_with("mailto:"))
            .find_map(|href| extract_email(href));

        draft.validate()
    }

    /// Prefers the number embedded in the phone button's item id, then its text
    async fn read_phone<D>(&self, driver: &mut D) -> Option<String>
    where
        D: PageDriver + ?Sized,
    {
        let from_id = driver
            .read_attribute(&self.selectors.phone, "data-item-id")
            .await
            .and_then(|id| phone_from_item_id(&id).map(str::to_string));

        let raw = match from_id {
            Some(number) => Some(number),
            None => driver.read_text(&self.selectors.phone).await,
        }?;

        let normalized = normalize_phone(&raw, &self.country_code);
        if normalized.is_none() {
            tracing::debug!("Unusable phone number {:?}", raw);
        }
        normalized
    }
}
