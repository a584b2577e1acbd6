//! Crawl progress reporting
//!
//! Observers are called synchronously, in crawl order, from the task running
//! the crawl.

use std::fmt;

/// Where a category crawl currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Existing store loaded
    LoadStore,
    /// A listing page is about to be fetched
    PageFetch,
    /// Detail enrichment progress within a page
    Enrich,
    /// Page merged and saved, moving on
    Continue,
    /// The category has no more pages
    LastPage,
    /// A listing page failed; the crawl advances
    PageError,
    /// The category could not be crawled
    CategoryError,
    /// The category finished
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadStore => "load_store",
            Stage::PageFetch => "page_fetch",
            Stage::Enrich => "enrich",
            Stage::Continue => "continue",
            Stage::LastPage => "last_page",
            Stage::PageError => "page_error",
            Stage::CategoryError => "category_error",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One progress notification
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// Category display name
    pub category: &'a str,
    pub page: u32,
    pub total_pages: u32,
    pub stage: Stage,
    pub message: &'a str,
}

/// Receives progress notifications during a crawl
pub trait ProgressObserver {
    fn on_progress(&self, event: &ProgressEvent<'_>);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressEvent<'_>),
{
    fn on_progress(&self, event: &ProgressEvent<'_>) {
        self(event)
    }
}

/// Observer that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, event: &ProgressEvent<'_>) {
        tracing::info!(
            "[{}] page {}/{} {}: {}",
            event.category,
            event.page,
            event.total_pages,
            event.stage,
            event.message
        );
    }
}
