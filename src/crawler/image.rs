//! Cover image extraction and resolution
//!
//! Posts reference covers in two ways: `<var class="postImg" title="...">`
//! lazy-load placeholders and ordinary `<img>` tags. Many of them point at an
//! image host's viewer page instead of the image itself, so each candidate
//! goes through a resolution step:
//!
//! | Candidate | Action |
//! |-----------|--------|
//! | Ends in an image extension | Accepted as-is |
//! | fastpic.ru / fastpic.org / imageban.ru | Viewer page fetched, direct URL extracted |
//! | Anything else | Passed through (and then rejected) |
//!
//! Only the first three candidates are tried. Nothing in here returns an
//! error: a failed candidate just moves on to the next one.

use crate::config::DEFAULT_SITE_ROOT;
use crate::crawler::fetcher::RequestManager;
use crate::utils::{delay, site_origin};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How many candidates are resolved before giving up
pub const MAX_RESOLVE_ATTEMPTS: usize = 3;

/// Pause between two resolution attempts
pub const RESOLVE_DELAY: Duration = Duration::from_millis(500);

/// Substrings marking decorative images (icons, smileys, rating stars, ...)
const DENYLIST: &[&str] = &["/icons/", "/smiles/", "magnet", "rating", "spacer"];

/// A `<var title>` is a candidate only if it mentions one of these
const VAR_HINTS: &[&str] = &["fastpic", "imageban", ".jpg", ".png", ".jpeg"];

/// Image hosts whose links lead to a viewer page
const INDIRECTION_HOSTS: &[&str] = &["fastpic.ru", "fastpic.org", "imageban.ru"];

static IMAGE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|bmp)(\?.*)?$").unwrap());

static LINKED_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png)").unwrap());

static VAR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("var[title]").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static OG_IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static VIEWER_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("#image").unwrap());
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// True if the URL ends in a known image extension
pub fn is_image_url(url: &str) -> bool {
    IMAGE_EXTENSION.is_match(url)
}

/// True if the URL points at a decorative asset
pub fn is_irrelevant_image(url: &str) -> bool {
    DENYLIST.iter().any(|needle| url.contains(needle))
}

/// True if the URL belongs to a host that serves viewer pages
pub fn is_indirection_host(url: &str) -> bool {
    INDIRECTION_HOSTS.iter().any(|host| url.contains(host))
}

/// Forces https: `//host/x` and `http://host/x` both become `https://host/x`
pub fn normalize_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    }
}

/// Rewrites thumbnail paths to their full-size equivalent
pub fn thumb_to_full(url: &str) -> String {
    if url.contains("/thumb/") {
        url.replace("/thumb/", "/big/").replace("_thumb", "")
    } else {
        url.to_string()
    }
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Makes a candidate absolute against the topic page origin
fn absolutize(src: &str, origin: &str) -> String {
    if src.starts_with("http") {
        src.to_string()
    } else if src.starts_with("//") {
        format!("https:{}", src)
    } else if src.starts_with('/') {
        format!("{}{}", origin, src)
    } else {
        format!("{}/{}", origin, src)
    }
}

/// Collects unique cover candidates from a post body, in document order
///
/// `<var>` placeholders are scanned before `<img>` tags.
pub fn collect_candidates(post_body: ElementRef<'_>, reference: Option<&str>) -> Vec<String> {
    let origin = site_origin(reference.unwrap_or(DEFAULT_SITE_ROOT));
    let mut found: Vec<String> = Vec::new();

    // Same image over http and https counts once; the first spelling is kept
    let mut push = |candidate: String| {
        let key = normalize_scheme(&candidate);
        if !found.iter().any(|seen| normalize_scheme(seen) == key) {
            found.push(candidate);
        }
    };

    for element in post_body.select(&VAR_SELECTOR) {
        let Some(title) = element.value().attr("title") else {
            continue;
        };
        if !VAR_HINTS.iter().any(|hint| title.contains(hint)) {
            continue;
        }

        let src = absolutize(strip_query(title.trim()), &origin);
        if is_irrelevant_image(&src) {
            continue;
        }
        push(thumb_to_full(&src));
    }

    for element in post_body.select(&IMG_SELECTOR) {
        let attrs = element.value();
        let Some(src) = attrs
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| attrs.attr("data-src"))
        else {
            continue;
        };

        let src = strip_query(src.trim());
        if src.is_empty() || is_irrelevant_image(src) {
            continue;
        }

        let src = thumb_to_full(&absolutize(src, &origin));
        push(normalize_scheme(&src));
    }

    found
}

/// Pulls the direct image URL out of an image host's viewer page
///
/// Priority: `og:image` meta tag, then the `#image` element, then the first
/// link to an image file.
pub fn extract_viewer_image(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let found = document
        .select(&OG_IMAGE_SELECTOR)
        .find_map(|meta| meta.value().attr("content"))
        .or_else(|| {
            document
                .select(&VIEWER_IMAGE_SELECTOR)
                .find_map(|img| img.value().attr("src"))
        })
        .or_else(|| {
            document
                .select(&ANCHOR_SELECTOR)
                .filter_map(|a| a.value().attr("href"))
                .find(|href| LINKED_IMAGE.is_match(href))
        })?
        .trim()
        .to_string();

    if found.is_empty() {
        return None;
    }

    let absolute = if found.starts_with("//") || found.starts_with("http") {
        found
    } else {
        Url::parse(page_url).ok()?.join(&found).ok()?.to_string()
    };

    Some(normalize_scheme(&absolute))
}

/// Resolves post images into a single direct cover URL
pub struct ImageProcessor {
    requests: Arc<RequestManager>,
    resolve_delay: Duration,
}

impl ImageProcessor {
    pub fn new(requests: Arc<RequestManager>) -> Self {
        Self {
            requests,
            resolve_delay: RESOLVE_DELAY,
        }
    }

    /// Replaces the pause between resolution attempts
    pub fn with_resolve_delay(mut self, resolve_delay: Duration) -> Self {
        self.resolve_delay = resolve_delay;
        self
    }

    /// Finds the cover of a post
    ///
    /// # Arguments
    ///
    /// * `post_body_html` - Markup of the post's main content node
    /// * `reference` - URL of the topic page, used to resolve relative paths
    ///
    /// # Returns
    ///
    /// The first candidate that resolves to a direct https image URL, or `None`
    pub async fn extract_first_image(
        &self,
        post_body_html: &str,
        reference: &str,
    ) -> Option<String> {
        let candidates = {
            let fragment = Html::parse_fragment(post_body_html);
            collect_candidates(fragment.root_element(), Some(reference))
        };

        tracing::debug!("{} image candidates in {}", candidates.len(), reference);
        let cover = self.resolve_cover(&candidates).await;
        if cover.is_none() {
            tracing::debug!("No direct cover image for {}", reference);
        }
        cover
    }

    /// Tries the first candidates in order and returns the first direct URL
    pub async fn resolve_cover(&self, candidates: &[String]) -> Option<String> {
        let attempts = candidates.len().min(MAX_RESOLVE_ATTEMPTS);

        for (index, candidate) in candidates.iter().take(attempts).enumerate() {
            if index > 0 {
                delay(self.resolve_delay).await;
            }

            tracing::debug!("Resolving cover {}/{}: {}", index + 1, attempts, candidate);
            match self.direct_image_url(candidate).await {
                Some(direct) if is_image_url(&direct) => {
                    let cover = normalize_scheme(&direct);
                    tracing::debug!("Cover resolved: {}", cover);
                    return Some(cover);
                }
                other => {
                    tracing::debug!("Not a direct image: {:?}", other);
                }
            }
        }

        None
    }

    /// One resolution hop for a single candidate
    async fn direct_image_url(&self, candidate: &str) -> Option<String> {
        if is_image_url(candidate) {
            return Some(candidate.to_string());
        }

        if !is_indirection_host(candidate) {
            return Some(candidate.to_string());
        }

        match self.requests.fetch(candidate).await {
            Ok(html) => extract_viewer_image(&html, candidate),
            Err(e) => {
                tracing::debug!("Viewer page {} failed: {}", candidate, e);
                None
            }
        }
    }
}
