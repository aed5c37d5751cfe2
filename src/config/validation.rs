use crate::config::types::{
    BrowserSettings, Config, HarvestConfig, OutputConfig, SearchConfig, SelectorConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_browser_settings(&config.browser)?;
    validate_harvest_config(&config.harvest)?;
    validate_selectors(&config.selectors)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use HTTP or HTTPS, got '{}'",
            config.base_url
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url cannot be used as a base: '{}'",
            config.base_url
        )));
    }

    Ok(())
}

fn validate_browser_settings(config: &BrowserSettings) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.element_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "element-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.window_width == 0 || config.window_height == 0 {
        return Err(ConfigError::Validation(format!(
            "window size must be non-zero, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.max_scroll_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-scroll-attempts must be >= 1".to_string(),
        ));
    }

    if config.stall_window < 1 {
        return Err(ConfigError::Validation(
            "stall-window must be >= 1".to_string(),
        ));
    }

    if config.commit_attempts < 1 || config.commit_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "commit-attempts must be between 1 and 10, got {}",
            config.commit_attempts
        )));
    }

    if config.scroll_delta <= 0 {
        return Err(ConfigError::Validation(format!(
            "scroll-delta must be positive, got {}",
            config.scroll_delta
        )));
    }

    if config.item_height <= 0 {
        return Err(ConfigError::Validation(format!(
            "item-height must be positive, got {}",
            config.item_height
        )));
    }

    validate_country_code(&config.default_country_code)?;

    Ok(())
}

fn validate_country_code(code: &str) -> Result<(), ConfigError> {
    if code.is_empty() || code.len() > 3 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "default-country-code must be 1-3 digits without '+', got '{}'",
            code
        )));
    }
    Ok(())
}

fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("feed", &config.feed),
        ("result-link", &config.result_link),
        ("end-of-list", &config.end_of_list),
        ("detail-ready", &config.detail_ready),
        ("name", &config.name),
        ("address", &config.address),
        ("phone", &config.phone),
        ("website", &config.website),
        ("rating", &config.rating),
        ("review-count", &config.review_count),
        ("category", &config.category),
        ("links", &config.links),
    ];

    for (key, selector) in selectors {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' cannot be empty",
                key
            )));
        }
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if matches!(config.export_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "export-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
