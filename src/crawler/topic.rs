//! Topic detail enrichment
//!
//! Each stub's detail page is fetched to find its cover image, magnet link
//! and size. Batches run through a bounded worker pool; a topic that fails
//! is kept as its plain stub.

use crate::config::Settings;
use crate::crawler::fetcher::RequestManager;
use crate::crawler::image::ImageProcessor;
use crate::storage::{Topic, TopicDetails, TopicStub, UNKNOWN_SIZE};
use crate::utils::map_bounded;
use crate::HarvestError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

static POST_BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".post_body").unwrap());
static MAGNET_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.magnet-link[href]").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+[.,]\d+)\s*(GB|MB|KB)").unwrap());

/// Fields pulled from a detail page before image resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    /// Outer markup of the first `.post_body`
    pub post_body_html: String,
    pub magnet: Option<String>,
    pub size: String,
}

/// Parses a detail page; `None` if it has no `.post_body`
pub fn parse_detail_page(html: &str, title: &str) -> Option<DetailPage> {
    let document = Html::parse_document(html);
    let post_body = document.select(&POST_BODY_SELECTOR).next()?;

    let body_text = post_body.text().collect::<String>();

    Some(DetailPage {
        post_body_html: post_body.html(),
        magnet: extract_magnet_link(&document),
        size: extract_file_size(&body_text, title),
    })
}

/// `a.magnet-link`, else the first anchor with a `magnet:` href
pub fn extract_magnet_link(document: &Html) -> Option<String> {
    document
        .select(&MAGNET_LINK_SELECTOR)
        .find_map(|a| a.value().attr("href"))
        .or_else(|| {
            document
                .select(&ANCHOR_SELECTOR)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.starts_with("magnet:"))
        })
        .map(str::to_string)
}

/// First `<number> GB|MB|KB` token in the body, then in the title
pub fn extract_file_size(body_text: &str, title: &str) -> String {
    SIZE_PATTERN
        .captures(body_text.trim())
        .or_else(|| SIZE_PATTERN.captures(title))
        .map(|caps| format!("{} {}", &caps[1], caps[2].to_uppercase()))
        .unwrap_or_else(|| UNKNOWN_SIZE.to_string())
}

/// Enriches topic stubs from their detail pages
pub struct TopicProcessor {
    requests: Arc<RequestManager>,
    images: ImageProcessor,
    concurrency: usize,
    topic_delay: Duration,
}

impl TopicProcessor {
    pub fn new(
        requests: Arc<RequestManager>,
        images: ImageProcessor,
        concurrency: usize,
        topic_delay: Duration,
    ) -> Self {
        Self {
            requests,
            images,
            concurrency: concurrency.max(1),
            topic_delay,
        }
    }

    pub fn from_settings(requests: Arc<RequestManager>, settings: &Settings) -> Self {
        let images = ImageProcessor::new(Arc::clone(&requests));
        Self::new(
            requests,
            images,
            settings.max_concurrent_topics,
            settings.topic_delay,
        )
    }

    /// Fetches one detail page and builds the enriched topic
    ///
    /// # Returns
    ///
    /// * `Ok(Topic)` - Enriched topic; cover, magnet and size may each be absent
    /// * `Err(HarvestError::DetailFetch)` - Fetch failed or no post body
    pub async fn process_topic_details(&self, stub: &TopicStub) -> Result<Topic, HarvestError> {
        let html = self
            .requests
            .fetch(&stub.url)
            .await
            .map_err(|e| HarvestError::DetailFetch {
                url: stub.url.clone(),
                reason: e.to_string(),
            })?;

        let page = parse_detail_page(&html, &stub.title).ok_or_else(|| {
            HarvestError::DetailFetch {
                url: stub.url.clone(),
                reason: "post body not found".to_string(),
            }
        })?;

        let cover = self
            .images
            .extract_first_image(&page.post_body_html, &stub.url)
            .await;

        Ok(Topic::enriched(
            stub.clone(),
            TopicDetails {
                cover,
                magnet: page.magnet,
                size: page.size,
            },
        ))
    }

    /// Enriches a batch; output has the input's length and order
    pub async fn process_topics_batch(&self, stubs: Vec<TopicStub>) -> Vec<Topic> {
        self.process_topics_batch_with_progress(stubs, |_, _| {})
            .await
    }

    /// Like [`process_topics_batch`](Self::process_topics_batch), calling
    /// `on_item(completed, total)` as each topic finishes
    pub async fn process_topics_batch_with_progress<F>(
        &self,
        stubs: Vec<TopicStub>,
        on_item: F,
    ) -> Vec<Topic>
    where
        F: Fn(usize, usize),
    {
        let total = stubs.len();
        if total == 0 {
            return Vec::new();
        }

        let completed = AtomicUsize::new(0);
        let completed = &completed;
        let on_item = &on_item;

        map_bounded(stubs, self.concurrency, self.topic_delay, |stub| async move {
            let topic = match self.process_topic_details(&stub).await {
                Ok(topic) => {
                    tracing::info!("Topic processed: {}", stub.title);
                    topic
                }
                Err(e) => {
                    tracing::warn!("Keeping {} unenriched: {}", stub.title, e);
                    Topic::unenriched(stub)
                }
            };

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_item(done, total);
            topic
        })
        .await
    }
}
