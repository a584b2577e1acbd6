//! Forum-Harvest: a category crawler for paginated tracker listings
//!
//! This crate walks the listing pages of each configured category, turns the
//! matching rows into topic records, enriches every record from its detail page
//! (cover image, magnet link, size) and persists the result into one JSON store
//! per category, deduplicated by topic id.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod utils;

use thiserror::Error;

/// Main error type for Forum-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to fetch details for {url}: {reason}")]
    DetailFetch { url: String, reason: String },

    #[error("Failed to process page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("Category not found or disabled: {0}")]
    CategoryNotFound(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// HTTP status carried by a network failure, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            Self::PageFetch { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Category configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },
}

/// Per-category store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse store {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for Forum-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// Re-export commonly used types
pub use config::{Category, CategoryUpdate, ConfigManager, Settings};
pub use crawler::{
    ImageProcessor, PageOutcome, PageProcessor, ProgressEvent, ProgressObserver, RequestManager,
    Scraper, Stage, TopicProcessor,
};
pub use output::{CategoryResult, CategoryStats, ConnectionReport, RunReport};
pub use storage::{CategoryManager, Topic, TopicDetails, TopicStub};
