//! Scraper coordinator - category crawl orchestration
//!
//! Categories are crawled one after another, and so are their listing pages.
//! Each page goes through:
//! - Fetching and scanning the listing for new topic stubs
//! - Enriching the stubs from their detail pages as one bounded batch
//! - Merging the batch into the category store and saving it
//!
//! Concurrency only exists inside the enrichment batch.

use crate::config::{Category, ConfigManager, Settings};
use crate::crawler::fetcher::RequestManager;
use crate::crawler::page::{generate_page_url, has_reached_max_start, PageOutcome, PageProcessor};
use crate::crawler::progress::{ProgressEvent, ProgressObserver, Stage};
use crate::crawler::topic::TopicProcessor;
use crate::output::{CategoryResult, CategoryStats, ConnectionReport, RunReport};
use crate::storage::CategoryManager;
use crate::utils::delay;
use crate::HarvestError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Page cap applied when the caller gives none
pub const DEFAULT_MAX_PAGES: u32 = 133;

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Text of the document's `<title>`, trimmed
fn page_title(html: &str) -> String {
    Html::parse_document(html)
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Forwards events for one category to an optional observer
struct CategoryProgress<'a> {
    observer: Option<&'a dyn ProgressObserver>,
    category: &'a str,
    total_pages: u32,
}

impl CategoryProgress<'_> {
    fn report(&self, page: u32, stage: Stage, message: &str) {
        if let Some(observer) = self.observer {
            observer.on_progress(&ProgressEvent {
                category: self.category,
                page,
                total_pages: self.total_pages,
                stage,
                message,
            });
        }
    }
}

/// Main scraper structure
pub struct Scraper {
    settings: Settings,
    requests: Arc<RequestManager>,
    config: ConfigManager,
    store: CategoryManager,
    pages: PageProcessor,
    topics: TopicProcessor,
}

impl Scraper {
    /// Creates a scraper from settings
    ///
    /// # Returns
    ///
    /// * `Ok(Scraper)` - Ready to crawl
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(settings: Settings) -> Result<Self, HarvestError> {
        let requests = Arc::new(RequestManager::new(settings.proxy_url.as_deref())?);
        Ok(Self::with_requests(settings, requests))
    }

    /// Creates a scraper from `SCRAPER_*` environment variables
    pub fn from_env() -> Result<Self, HarvestError> {
        Self::new(Settings::from_env()?)
    }

    /// Creates a scraper around an existing fetcher
    pub fn with_requests(settings: Settings, requests: Arc<RequestManager>) -> Self {
        let config = ConfigManager::new(&settings.config_dir);
        let store = CategoryManager::new(settings.data_dir.clone());
        let pages = PageProcessor::new(Arc::clone(&requests));
        let topics = TopicProcessor::from_settings(Arc::clone(&requests), &settings);

        Self {
            settings,
            requests,
            config,
            store,
            pages,
            topics,
        }
    }

    pub fn with_config_manager(mut self, config: ConfigManager) -> Self {
        self.config = config;
        self
    }

    pub fn with_topic_processor(mut self, topics: TopicProcessor) -> Self {
        self.topics = topics;
        self
    }

    pub fn requests(&self) -> &Arc<RequestManager> {
        &self.requests
    }

    pub fn config_manager(&mut self) -> &mut ConfigManager {
        &mut self.config
    }

    /// Crawls every enabled category in config order
    ///
    /// A failing category is recorded in the report and the run moves on.
    /// The request cache is cleared once all categories are done.
    pub async fn run_all(
        &mut self,
        observer: Option<&dyn ProgressObserver>,
        max_pages: Option<u32>,
    ) -> RunReport {
        let categories = self.config.load_categories();
        tracing::info!(
            "Starting multi-category scrape: {}",
            categories
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let report = self.crawl_categories(&categories, observer, max_pages).await;
        self.requests.clear_cache();
        report
    }

    /// Crawls the enabled categories that already have a store file
    pub async fn refresh_existing(
        &mut self,
        observer: Option<&dyn ProgressObserver>,
        max_pages: Option<u32>,
    ) -> Result<RunReport, HarvestError> {
        let stored = self.store.list_store_files()?;
        let categories: Vec<Category> = self
            .config
            .load_categories()
            .into_iter()
            .filter(|category| stored.contains(&category.id))
            .collect();

        tracing::info!("Refreshing {} stored categories", categories.len());

        let report = self.crawl_categories(&categories, observer, max_pages).await;
        self.requests.clear_cache();
        Ok(report)
    }

    /// Crawls a single enabled category
    pub async fn run_category(
        &mut self,
        category_id: &str,
        observer: Option<&dyn ProgressObserver>,
        max_pages: Option<u32>,
    ) -> CategoryResult {
        tracing::info!("Starting scrape for category {}", category_id);
        self.config.load_categories();

        let result = match self.config.category_by_id(category_id).cloned() {
            Some(category) => self.crawl_one(&category, observer, max_pages).await,
            None => {
                let error = HarvestError::CategoryNotFound(category_id.to_string());
                tracing::error!("{}", error);
                CategoryResult::failed(category_id, error)
            }
        };

        self.requests.clear_cache();
        result
    }

    /// Fetches the site root and reports its title
    pub async fn test_connection(&self) -> ConnectionReport {
        tracing::info!("Testing connection to {}", self.settings.site_root);

        match self.requests.fetch(&self.settings.site_root).await {
            Ok(html) => {
                let title = page_title(&html);
                tracing::info!("Connection OK: {}", title);
                ConnectionReport::reachable(title)
            }
            Err(e) => {
                tracing::error!("Connection failed: {}", e);
                ConnectionReport::unreachable(e)
            }
        }
    }

    async fn crawl_categories(
        &self,
        categories: &[Category],
        observer: Option<&dyn ProgressObserver>,
        max_pages: Option<u32>,
    ) -> RunReport {
        let mut results = BTreeMap::new();

        for (index, category) in categories.iter().enumerate() {
            tracing::info!(
                "Processing category {} ({}/{})",
                category.name,
                index + 1,
                categories.len()
            );

            let result = self.crawl_one(category, observer, max_pages).await;
            results.insert(category.id.clone(), result);
        }

        RunReport::new(results)
    }

    async fn crawl_one(
        &self,
        category: &Category,
        observer: Option<&dyn ProgressObserver>,
        max_pages: Option<u32>,
    ) -> CategoryResult {
        let total_pages = max_pages.unwrap_or(DEFAULT_MAX_PAGES);
        let progress = CategoryProgress {
            observer,
            category: &category.name,
            total_pages,
        };

        match self.process_category(category, &progress).await {
            Ok(stats) => {
                progress.report(stats.pages_processed, Stage::Done, "Category finished");
                CategoryResult::completed(&category.name, stats)
            }
            Err(e) => {
                tracing::error!("Category {} failed: {}", category.name, e);
                progress.report(0, Stage::CategoryError, &e.to_string());
                CategoryResult::failed(&category.id, e)
            }
        }
    }

    /// Walks a category's listing pages until the last page or a page cap
    ///
    /// # State Machine
    ///
    /// | Stage | Next |
    /// |-------|------|
    /// | Load store | Page fetch |
    /// | Page fetch, new stubs | Enrich, merge, save, then Continue |
    /// | Page fetch, last page | Done |
    /// | Page fetch, error | Logged, Continue |
    /// | Continue | Page fetch, unless the page cap or ceiling is hit |
    async fn process_category(
        &self,
        category: &Category,
        progress: &CategoryProgress<'_>,
    ) -> Result<CategoryStats, HarvestError> {
        let mut existing = self.store.load_category_data(&category.id);
        let initial_len = existing.len();
        progress.report(
            0,
            Stage::LoadStore,
            &format!("{} stored topics", initial_len),
        );

        let mut stats = CategoryStats::default();
        let mut page = 0;

        while page < progress.total_pages {
            page += 1;
            stats.pages_processed = page;

            let url = generate_page_url(category, page);
            progress.report(
                page,
                Stage::PageFetch,
                &format!("{}: page {}/{}", category.name, page, progress.total_pages),
            );

            match self.pages.process_category_page(&url, category, &existing).await {
                Ok(PageOutcome::LastPage) => {
                    progress.report(page, Stage::LastPage, "No more pages");
                    break;
                }
                Ok(PageOutcome::Listing { topics, stats: page_stats }) => {
                    stats.new_topics_found += page_stats.new;
                    stats.duplicates_skipped += page_stats.duplicates;

                    if !topics.is_empty() {
                        let enriched = self
                            .topics
                            .process_topics_batch_with_progress(topics, |done, total| {
                                progress.report(
                                    page,
                                    Stage::Enrich,
                                    &format!("{}/{} topics", done, total),
                                );
                            })
                            .await;

                        existing = self
                            .store
                            .save_category_data(&category.id, &existing, &enriched)?;
                        tracing::info!(
                            "{} topics added to {}.json",
                            enriched.len(),
                            category.id
                        );
                    }

                    progress.report(
                        page,
                        Stage::Continue,
                        &format!("{} new, {} duplicates", page_stats.new, page_stats.duplicates),
                    );
                }
                Err(e) => {
                    tracing::warn!("Page {} of {} failed, continuing: {}", page, category.name, e);
                    progress.report(page, Stage::PageError, &e.to_string());
                }
            }

            if has_reached_max_start(page) {
                tracing::info!("Listing ceiling reached for {}", category.name);
                break;
            }

            delay(self.settings.page_delay).await;
        }

        let final_len = self.store.load_category_data(&category.id).len();
        stats.new_items = final_len.saturating_sub(initial_len);
        stats.total_in_file = final_len;

        tracing::info!(
            "Category {} summary: {} pages, {} new topics, {} duplicates, {} new items, {} in file",
            category.name,
            stats.pages_processed,
            stats.new_topics_found,
            stats.duplicates_skipped,
            stats.new_items,
            stats.total_in_file
        );

        Ok(stats)
    }
}
