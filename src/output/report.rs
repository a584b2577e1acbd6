//! Result types returned by the scraper entry points

use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for one category crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    /// Listing pages that were fetched and scanned
    pub pages_processed: u32,

    /// Stubs found on listing pages that were not yet stored
    pub new_topics_found: usize,

    /// Listing rows skipped because their topic was already stored
    pub duplicates_skipped: usize,

    /// Growth of the store over the run
    pub new_items: usize,

    /// Store size after the run
    pub total_in_file: usize,
}

/// Outcome of crawling one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CategoryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryResult {
    pub fn completed(category_name: &str, stats: CategoryStats) -> Self {
        Self {
            success: true,
            message: format!("Category {} processed successfully", category_name),
            stats: Some(stats),
            error: None,
        }
    }

    pub fn failed(category_id: &str, error: impl ToString) -> Self {
        Self {
            success: false,
            message: format!("Scraping failed for category {}", category_id),
            stats: None,
            error: Some(error.to_string()),
        }
    }
}

/// Outcome of a multi-category run, keyed by category id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub success: bool,
    pub message: String,
    pub categories: BTreeMap<String, CategoryResult>,
}

impl RunReport {
    pub fn new(categories: BTreeMap<String, CategoryResult>) -> Self {
        Self {
            success: true,
            message: format!("Multi-category scrape finished ({} categories)", categories.len()),
            categories,
        }
    }

    /// Ids of categories whose crawl failed
    pub fn failed_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|(_, result)| !result.success)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.categories.values().all(|result| result.success)
    }

    /// Sum of per-category counters
    pub fn totals(&self) -> CategoryStats {
        self.categories
            .values()
            .filter_map(|result| result.stats)
            .fold(CategoryStats::default(), |acc, stats| CategoryStats {
                pages_processed: acc.pages_processed + stats.pages_processed,
                new_topics_found: acc.new_topics_found + stats.new_topics_found,
                duplicates_skipped: acc.duplicates_skipped + stats.duplicates_skipped,
                new_items: acc.new_items + stats.new_items,
                total_in_file: acc.total_in_file + stats.total_in_file,
            })
    }
}

/// Result of probing the site root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionReport {
    pub fn reachable(title: String) -> Self {
        Self {
            success: true,
            title: Some(title),
            error: None,
        }
    }

    pub fn unreachable(error: impl ToString) -> Self {
        Self {
            success: false,
            title: None,
            error: Some(error.to_string()),
        }
    }
}
