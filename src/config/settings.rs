//! Environment-sourced runtime settings
//!
//! | Variable | Also read as | Default |
//! |----------|--------------|---------|
//! | `SCRAPER_DATA_DIR` | | `./data` |
//! | `SCRAPER_CONFIG_DIR` | | `./config` |
//! | `SCRAPER_PROXY_URL` | | none |
//! | `SCRAPER_PAGE_DELAY_MS` | `SCRAPER_PAGEDELAYMS` | 2000 |
//! | `SCRAPER_TOPIC_DELAY_MS` | `SCRAPER_TOPICDELAYMS` | 500 |
//! | `SCRAPER_MAX_CONCURRENT_TOPICS` | `SCRAPER_MAXCONCURRENTTOPICS` | 2 (0 = default, max 32) |
//! | `SCRAPER_SITE_ROOT` | | `https://rutracker.org` |

use crate::config::validation::validate_settings;
use crate::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SITE_ROOT: &str = "https://rutracker.org";
pub const DEFAULT_PAGE_DELAY_MS: u64 = 2000;
pub const DEFAULT_TOPIC_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_CONCURRENT_TOPICS: usize = 2;
pub const MAX_CONCURRENT_TOPICS: usize = 32;

/// Tunables for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding `<category>.json` stores
    pub data_dir: PathBuf,

    /// Writable directory holding `categories.json`
    pub config_dir: PathBuf,

    /// Outbound proxy applied to every request
    pub proxy_url: Option<String>,

    /// Pause between listing page fetches
    pub page_delay: Duration,

    /// Pause after each topic before its worker slot is reused
    pub topic_delay: Duration,

    /// Width of the enrichment worker pool
    pub max_concurrent_topics: usize,

    /// Root page used by the connectivity check
    pub site_root: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            config_dir: PathBuf::from("config"),
            proxy_url: None,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            topic_delay: Duration::from_millis(DEFAULT_TOPIC_DELAY_MS),
            max_concurrent_topics: DEFAULT_MAX_CONCURRENT_TOPICS,
            site_root: DEFAULT_SITE_ROOT.to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup
    ///
    /// Empty values count as unset. Numbers that fail to parse fall back to
    /// their default with a warning. Each numeric key also answers to its
    /// legacy unseparated spelling (`SCRAPER_PAGEDELAYMS`); the separated
    /// name wins when both are set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_numeric = |key: &str| get(key).or_else(|| get(&legacy_key(key)));
        let defaults = Self::default();

        let settings = Self {
            data_dir: get("SCRAPER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            config_dir: get("SCRAPER_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_dir),
            proxy_url: get("SCRAPER_PROXY_URL"),
            page_delay: Duration::from_millis(parse_or(
                "SCRAPER_PAGE_DELAY_MS",
                get_numeric("SCRAPER_PAGE_DELAY_MS"),
                DEFAULT_PAGE_DELAY_MS,
            )),
            topic_delay: Duration::from_millis(parse_or(
                "SCRAPER_TOPIC_DELAY_MS",
                get_numeric("SCRAPER_TOPIC_DELAY_MS"),
                DEFAULT_TOPIC_DELAY_MS,
            )),
            max_concurrent_topics: bounded_concurrency(parse_or(
                "SCRAPER_MAX_CONCURRENT_TOPICS",
                get_numeric("SCRAPER_MAX_CONCURRENT_TOPICS"),
                DEFAULT_MAX_CONCURRENT_TOPICS,
            )),
            site_root: get("SCRAPER_SITE_ROOT").unwrap_or(defaults.site_root),
        };

        validate_settings(&settings)?;
        Ok(settings)
    }
}

/// `SCRAPER_PAGE_DELAY_MS` -> `SCRAPER_PAGEDELAYMS`
fn legacy_key(key: &str) -> String {
    match key.strip_prefix("SCRAPER_") {
        Some(rest) => format!("SCRAPER_{}", rest.replace('_', "")),
        None => key.replace('_', ""),
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring {}={:?}, using default {}", key, value, default);
            default
        }),
        None => default,
    }
}

/// Zero means "unset"; anything above the pool ceiling is clamped
fn bounded_concurrency(value: usize) -> usize {
    if value == 0 {
        tracing::warn!(
            "SCRAPER_MAX_CONCURRENT_TOPICS=0, using default {}",
            DEFAULT_MAX_CONCURRENT_TOPICS
        );
        DEFAULT_MAX_CONCURRENT_TOPICS
    } else if value > MAX_CONCURRENT_TOPICS {
        tracing::warn!(
            "SCRAPER_MAX_CONCURRENT_TOPICS={} clamped to {}",
            value,
            MAX_CONCURRENT_TOPICS
        );
        MAX_CONCURRENT_TOPICS
    } else {
        value
    }
}
