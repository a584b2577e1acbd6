//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with browser-like headers and an optional proxy
//! - A per-run cache of decoded bodies keyed by URL, shared by concurrent
//!   callers of the same URL
//! - Charset decoding (windows-1251 unless UTF-8 is declared)
//! - A single retry on HTTP 403 with browser navigation headers

use crate::HarvestError;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Total time allowed for one request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP client
///
/// # Arguments
///
/// * `proxy_url` - Optional outbound proxy applied to every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy or TLS backend failure
pub fn build_http_client(proxy_url: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Accept",
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.8,ru;q=0.7"),
    );

    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy_url {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Headers a browser sends on a top-level navigation
fn navigation_headers(url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-origin"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Pragma", HeaderValue::from_static("no-cache"));

    if let Ok(parsed) = Url::parse(url) {
        let referer = format!("{}/", parsed.origin().ascii_serialization());
        if let Ok(value) = HeaderValue::from_str(&referer) {
            headers.insert("Referer", value);
        }
    }

    headers
}

/// Picks the decoder for a response
///
/// Only windows-1251 and UTF-8 declarations are honoured; everything else
/// is read as windows-1251.
pub fn encoding_for(content_type: &str) -> &'static Encoding {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("windows-1251") || content_type.contains("cp1251") {
        WINDOWS_1251
    } else if content_type.contains("utf-8") {
        UTF_8
    } else {
        WINDOWS_1251
    }
}

type CacheSlot = Arc<OnceCell<String>>;

/// HTTP fetcher with a per-run response cache
///
/// Each URL owns one slot. Concurrent fetches of the same URL wait on that
/// slot so only one request goes out. A failed fetch leaves the slot empty
/// and the next caller tries again. The cache is cleared only by
/// [`RequestManager::clear_cache`], which the orchestrator calls at the end
/// of a run.
pub struct RequestManager {
    client: Client,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

impl RequestManager {
    /// Creates a fetcher, optionally routing all requests through a proxy
    pub fn new(proxy_url: Option<&str>) -> Result<Self, HarvestError> {
        Ok(Self::with_client(build_http_client(proxy_url)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches `url` and returns the decoded body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Cached URL | Served from cache, no request |
    /// | Same URL in flight | Waits for that request's body |
    /// | HTTP 403 | Retry once with navigation headers |
    /// | Second failure | `HarvestError::Network` |
    /// | Other non-2xx | `HarvestError::Network` |
    /// | Timeout / connection error | `HarvestError::Network` |
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let slot = self.slot(url);
        if let Some(body) = slot.get() {
            tracing::debug!("Cache hit: {}", url);
            return Ok(body.clone());
        }

        slot.get_or_try_init(|| self.fetch_uncached(url))
            .await
            .cloned()
    }

    async fn fetch_uncached(&self, url: &str) -> Result<String, HarvestError> {
        tracing::debug!("Fetching {}", url);
        match self.fetch_once(url, None).await {
            Err(e) if e.status() == Some(StatusCode::FORBIDDEN.as_u16()) => {
                tracing::warn!("403 from {}, retrying with navigation headers", url);
                self.fetch_once(url, Some(navigation_headers(url))).await
            }
            other => other,
        }
    }

    async fn fetch_once(
        &self,
        url: &str,
        extra_headers: Option<HeaderMap>,
    ) -> Result<String, HarvestError> {
        let mut request = self.client.get(url);
        if let Some(headers) = extra_headers {
            request = request.headers(headers);
        }

        let response = request
            .send()
            .await
            .map_err(|e| network_error(url, None, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                message: format!("HTTP {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| network_error(url, Some(status.as_u16()), &e))?;

        let (text, _, _) = encoding_for(&content_type).decode(&bytes);
        Ok(text.into_owned())
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheSlot>> {
        // A poisoned cache only means a panic elsewhere mid-insert
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The slot for `url`, created on first use; the lock is released on return
    fn slot(&self, url: &str) -> CacheSlot {
        Arc::clone(self.lock_cache().entry(url.to_string()).or_default())
    }

    /// Drops every cached body
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Number of URLs with a cached body
    pub fn cache_size(&self) -> usize {
        self.lock_cache()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }
}

fn network_error(url: &str, status: Option<u16>, error: &reqwest::Error) -> HarvestError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    HarvestError::Network {
        url: url.to_string(),
        status: error.status().map(|s| s.as_u16()).or(status),
        message,
    }
}
