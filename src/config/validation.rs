use crate::config::settings::{Settings, MAX_CONCURRENT_TOPICS};
use crate::config::types::Category;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates a full category list
pub fn validate_categories(categories: &[Category]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::Validation(
            "category list cannot be empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for category in categories {
        validate_category(category)?;

        if !seen.insert(category.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category id '{}'",
                category.id
            )));
        }
    }

    Ok(())
}

/// Keeps the entries that pass [`validate_category`], dropping later
/// duplicates of an id
///
/// Returns the kept entries and how many were dropped.
pub fn retain_valid_categories(categories: Vec<Category>) -> (Vec<Category>, usize) {
    let total = categories.len();
    let mut seen = HashSet::new();

    let kept: Vec<Category> = categories
        .into_iter()
        .filter(|category| match validate_category(category) {
            Ok(()) if seen.insert(category.id.clone()) => true,
            Ok(()) => {
                tracing::warn!("Skipping duplicate category id '{}'", category.id);
                false
            }
            Err(e) => {
                tracing::warn!("Skipping invalid category '{}': {}", category.id, e);
                false
            }
        })
        .collect();

    let dropped = total - kept.len();
    (kept, dropped)
}

/// Validates a single category entry
pub fn validate_category(category: &Category) -> Result<(), ConfigError> {
    validate_category_id(&category.id)?;

    let url = Url::parse(&category.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid baseUrl '{}' for '{}': {}",
            category.base_url, category.id, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "baseUrl '{}' for '{}' must use http or https",
            category.base_url, category.id
        )));
    }

    if category.title_search.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "titleSearch cannot be empty for '{}'",
            category.id
        )));
    }

    Ok(())
}

/// Category ids double as file names: alphanumerics, `-` and `_` only
fn validate_category_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Validation(
            "category id cannot be empty".to_string(),
        ));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "category id must contain only alphanumeric characters, '-' or '_', got '{}'",
            id
        )));
    }

    Ok(())
}

/// Validates environment settings
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.max_concurrent_topics < 1 || settings.max_concurrent_topics > MAX_CONCURRENT_TOPICS {
        return Err(ConfigError::InvalidSetting {
            key: "SCRAPER_MAX_CONCURRENT_TOPICS".to_string(),
            message: format!(
                "must be between 1 and {}, got {}",
                MAX_CONCURRENT_TOPICS, settings.max_concurrent_topics
            ),
        });
    }

    if let Some(proxy) = &settings.proxy_url {
        Url::parse(proxy).map_err(|e| ConfigError::InvalidSetting {
            key: "SCRAPER_PROXY_URL".to_string(),
            message: e.to_string(),
        })?;
    }

    Url::parse(&settings.site_root).map_err(|e| ConfigError::InvalidSetting {
        key: "SCRAPER_SITE_ROOT".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}
