//! Small helpers shared by the crawl pipeline
//!
//! - Title cleanup for listing rows
//! - Topic id extraction from listing links
//! - Dedup predicate against a loaded store
//! - Site origin of a URL
//! - Semaphore-gated concurrent map with a per-slot cooldown

use crate::config::DEFAULT_SITE_ROOT;
use crate::storage::Topic;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

static NUMERIC_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(\d+);").unwrap());
static BRACKET_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TOPIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"t=(\d+)").unwrap());

/// Cleans a listing title for storage
///
/// Decodes numeric and the common named HTML entities, removes every
/// bracketed tag (`[PS2]`, `[2005, RPG]`, ...) and collapses whitespace.
///
/// # Example
///
/// ```
/// use forum_harvest::utils::clean_title;
///
/// assert_eq!(clean_title("[PS2] Tom &amp; Jerry [2003]"), "Tom & Jerry");
/// ```
pub fn clean_title(title: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(title, |caps: &regex::Captures<'_>| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    let decoded = decoded
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let stripped = BRACKET_TAG.replace_all(&decoded, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Extracts the numeric topic id (`t=<digits>`) from a listing link
pub fn extract_topic_id(url: &str) -> Option<String> {
    TOPIC_ID.captures(url).map(|caps| caps[1].to_string())
}

/// Returns true if a topic with this id is already in the store
pub fn topic_exists(existing: &[Topic], topic_id: &str) -> bool {
    existing.iter().any(|topic| topic.stub.topic_id == topic_id)
}

/// Sleeps for the given duration; zero returns immediately
pub async fn delay(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Maps `items` through `f` with at most `limit` calls in flight
///
/// Results keep the input order. After each call completes its slot stays
/// taken for `cooldown` before the next item may start, so `cooldown` spaces
/// out requests per worker.
pub async fn map_bounded<T, R, F, Fut>(
    items: Vec<T>,
    limit: usize,
    cooldown: Duration,
    f: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;
    let f = &f;

    join_all(items.into_iter().map(|item| async move {
        // The semaphore is never closed, so acquire cannot fail
        let _permit = semaphore.acquire().await.ok();
        let result = f(item).await;
        delay(cooldown).await;
        result
    }))
    .await
}

/// `scheme://host[:port]` of `url`, or the default site root if it has none
pub fn site_origin(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|url| url.origin().ascii_serialization())
        .filter(|origin| origin != "null")
        .unwrap_or_else(|| DEFAULT_SITE_ROOT.to_string())
}
