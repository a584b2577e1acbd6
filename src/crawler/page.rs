//! Listing page processing
//!
//! A listing page either carries the "nothing found" notice (the category is
//! exhausted) or a table of topic rows. Rows are kept when their title holds
//! the category's filter token and their id is not already stored.

use crate::config::{fix_stale_host, Category};
use crate::crawler::fetcher::RequestManager;
use crate::storage::{Topic, TopicStub};
use crate::utils::{clean_title, extract_topic_id, site_origin, topic_exists};
use crate::HarvestError;
use chrono::{DateTime, SubsecRound, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;

/// Topics per listing page
pub const PAGE_SIZE: u32 = 50;

/// Offset at which the site stops serving listing pages (130 pages)
pub const MAX_START_OFFSET: u32 = 6450;

/// Header text of the informational message box
const INFO_MARKER: &str = "Информация";

/// Body text shown when a listing offset has no topics
const NOTHING_FOUND_MARKER: &str = "Подходящих тем или сообщений не найдено";

static TOPIC_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.torTopic").unwrap());
static INFO_HEADER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.forumline.message th").unwrap());
static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").unwrap());

/// Counts for one processed listing page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub new: usize,
    pub duplicates: usize,
}

/// Result of scanning one listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The category has no more pages
    LastPage,

    /// New topic stubs found on the page
    Listing {
        topics: Vec<TopicStub>,
        stats: PageStats,
    },
}

impl PageOutcome {
    pub fn is_last_page(&self) -> bool {
        matches!(self, Self::LastPage)
    }
}

/// Listing URL for a 1-based page number
///
/// # Example
///
/// ```
/// use forum_harvest::config::Category;
/// use forum_harvest::crawler::generate_page_url;
///
/// let category = Category {
///     id: "ps2".into(),
///     name: "Playstation 2".into(),
///     base_url: "https://rutracker.org/forum/viewforum.php?f=357".into(),
///     title_search: "[PS2]".into(),
///     enabled: true,
///     priority: 1,
/// };
///
/// assert_eq!(generate_page_url(&category, 1), category.base_url);
/// assert!(generate_page_url(&category, 3).ends_with("&start=100"));
/// ```
pub fn generate_page_url(category: &Category, page: u32) -> String {
    let base = corrected_base_url(category);
    let start = start_offset(page);

    if start == 0 {
        base
    } else {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}start={}", base, separator, start)
    }
}

/// True once the page's offset reaches the hard listing ceiling
pub fn has_reached_max_start(page: u32) -> bool {
    start_offset(page) >= MAX_START_OFFSET
}

fn start_offset(page: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(PAGE_SIZE)
}

fn corrected_base_url(category: &Category) -> String {
    fix_stale_host(&category.base_url).unwrap_or_else(|| category.base_url.clone())
}

/// Detects the "no more topics" page
///
/// Both the informational header and the "nothing found" notice must be present.
pub fn is_last_page(document: &Html) -> bool {
    let has_info_header = document
        .select(&INFO_HEADER_SELECTOR)
        .any(|th| th.text().collect::<String>().contains(INFO_MARKER));

    has_info_header
        && document
            .select(&DIV_SELECTOR)
            .any(|div| div.text().collect::<String>().contains(NOTHING_FOUND_MARKER))
}

/// Makes a listing href absolute against the category's own origin
pub fn resolve_topic_url(href: &str, category: &Category) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }

    let origin = site_origin(&corrected_base_url(category));

    if href.starts_with('/') {
        Some(format!("{}{}", origin, href))
    } else {
        Some(format!("{}/forum/{}", origin, href))
    }
}

/// Extracts new topic stubs from listing markup
///
/// Rows without the filter token or without a numeric topic id are ignored.
/// Rows whose id is already stored (or repeated on the page) count as
/// duplicates.
pub fn scan_listing(
    html: &str,
    category: &Category,
    existing: &[Topic],
    scraped_at: DateTime<Utc>,
) -> PageOutcome {
    let document = Html::parse_document(html);

    if is_last_page(&document) {
        return PageOutcome::LastPage;
    }

    let mut topics = Vec::new();
    let mut stats = PageStats::default();
    let mut seen_on_page = HashSet::new();

    for link in document.select(&TOPIC_LINK_SELECTOR) {
        let title = link.text().collect::<String>();
        let title = title.trim();
        if title.is_empty() || !title.contains(&category.title_search) {
            continue;
        }

        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(topic_id) = extract_topic_id(href) else {
            tracing::debug!("No topic id in {}", href);
            continue;
        };
        let Some(url) = resolve_topic_url(href, category) else {
            continue;
        };

        let cleaned = clean_title(title);
        if topic_exists(existing, &topic_id) || !seen_on_page.insert(topic_id.clone()) {
            stats.duplicates += 1;
            tracing::debug!("Already stored: {}", cleaned);
            continue;
        }

        tracing::debug!("New topic: {}", cleaned);
        topics.push(TopicStub::new(
            topic_id,
            cleaned,
            url,
            category.id.clone(),
            scraped_at,
        ));
        stats.new += 1;
    }

    PageOutcome::Listing { topics, stats }
}

/// Fetches and scans listing pages
pub struct PageProcessor {
    requests: Arc<RequestManager>,
}

impl PageProcessor {
    pub fn new(requests: Arc<RequestManager>) -> Self {
        Self { requests }
    }

    /// Fetches one listing page and extracts its new topics
    ///
    /// # Returns
    ///
    /// * `Ok(PageOutcome::LastPage)` - The category is exhausted
    /// * `Ok(PageOutcome::Listing { .. })` - New stubs and page counts
    /// * `Err(HarvestError::PageFetch)` - The page could not be fetched
    pub async fn process_category_page(
        &self,
        url: &str,
        category: &Category,
        existing: &[Topic],
    ) -> Result<PageOutcome, HarvestError> {
        tracing::info!("Processing {} page: {}", category.name, url);

        let html = self
            .requests
            .fetch(url)
            .await
            .map_err(|e| HarvestError::PageFetch {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        let outcome = scan_listing(&html, category, existing, Utc::now().trunc_subsecs(3));

        match &outcome {
            PageOutcome::LastPage => {
                tracing::info!("Last page reached for {}", category.name);
            }
            PageOutcome::Listing { stats, .. } => {
                tracing::info!(
                    "Page processed ({}): {} new, {} duplicates",
                    category.name,
                    stats.new,
                    stats.duplicates
                );
            }
        }

        Ok(outcome)
    }
}
