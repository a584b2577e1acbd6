//! Crawler module for listing and detail page processing
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching with a per-run cache and charset decoding
//! - Listing page scanning and pagination
//! - Topic detail enrichment and cover image resolution
//! - Overall category crawl coordination

mod coordinator;
mod fetcher;
mod image;
mod page;
mod progress;
mod topic;

pub use coordinator::{Scraper, DEFAULT_MAX_PAGES};
pub use fetcher::{build_http_client, encoding_for, RequestManager, REQUEST_TIMEOUT};
pub use image::{
    collect_candidates, extract_viewer_image, is_image_url, is_indirection_host,
    is_irrelevant_image, normalize_scheme, thumb_to_full, ImageProcessor, MAX_RESOLVE_ATTEMPTS,
    RESOLVE_DELAY,
};
pub use page::{
    generate_page_url, has_reached_max_start, is_last_page, resolve_topic_url, scan_listing,
    PageOutcome, PageProcessor, PageStats, MAX_START_OFFSET, PAGE_SIZE,
};
pub use progress::{LogObserver, ProgressEvent, ProgressObserver, Stage};
pub use topic::{
    extract_file_size, extract_magnet_link, parse_detail_page, DetailPage, TopicProcessor,
};
