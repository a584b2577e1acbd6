//! Shared fixtures for the integration tests

use forum_harvest::{Category, ImageProcessor, RequestManager, Scraper, Settings, TopicProcessor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::ResponseTemplate;

pub const LISTING_PATH: &str = "/forum/viewforum.php";
pub const TOPIC_PATH: &str = "/forum/viewtopic.php";

/// A 200 response carrying UTF-8 html
pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

pub fn category(server_uri: &str, id: &str, token: &str) -> Category {
    Category {
        id: id.to_string(),
        name: format!("Category {}", id),
        base_url: format!("{}{}?f=357", server_uri, LISTING_PATH),
        title_search: token.to_string(),
        enabled: true,
        priority: 1,
    }
}

/// Writes an override `categories.json` into `config_dir`
pub fn write_categories(config_dir: &Path, categories: &[Category]) {
    std::fs::create_dir_all(config_dir).unwrap();
    let json = serde_json::json!({ "categories": categories });
    std::fs::write(
        config_dir.join("categories.json"),
        serde_json::to_string_pretty(&json).unwrap(),
    )
    .unwrap();
}

/// Settings rooted in `dir` with every delay disabled
pub fn settings(dir: &Path, site_root: &str) -> Settings {
    Settings {
        data_dir: dir.join("data"),
        config_dir: dir.join("config"),
        page_delay: Duration::ZERO,
        topic_delay: Duration::ZERO,
        site_root: site_root.to_string(),
        ..Settings::default()
    }
}

pub fn topic_processor(requests: &Arc<RequestManager>) -> TopicProcessor {
    let images = ImageProcessor::new(Arc::clone(requests)).with_resolve_delay(Duration::ZERO);
    TopicProcessor::new(Arc::clone(requests), images, 2, Duration::ZERO)
}

/// A scraper with no delays anywhere
pub fn scraper(settings: Settings) -> Scraper {
    let requests = Arc::new(RequestManager::new(None).unwrap());
    let topics = topic_processor(&requests);
    Scraper::with_requests(settings, requests).with_topic_processor(topics)
}

/// Listing markup with one `a.torTopic` row per `(topic_id, title)`
pub fn listing(rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(id, title)| {
            format!(
                r#"<tr><td><a class="torTopic" href="viewtopic.php?t={}">{}</a></td></tr>"#,
                id, title
            )
        })
        .collect();

    format!(
        r#"<html><body><table class="vf-table">{}</table></body></html>"#,
        rows
    )
}

pub const LAST_PAGE: &str = r#"<html><body>
    <table class="forumline message"><tr><th>Информация</th></tr>
    <tr><td><div class="mrg_16">Подходящих тем или сообщений не найдено</div></td></tr></table>
</body></html>"#;

/// Detail page whose cover sits behind a viewer page on the mock server
pub fn detail_page(server_uri: &str, size: &str) -> String {
    format!(
        r#"<html><body>
        <div class="post_body">
            <var class="postImg" title="{uri}/fastpic.ru/view/cover.html"></var>
            <img src="{uri}/static/icons/spacer.gif">
            Размер: {size}
        </div>
        <a class="magnet-link" href="magnet:?xt=urn:btih:0123456789abcdef">magnet</a>
        </body></html>"#,
        uri = server_uri,
        size = size
    )
}

/// Viewer page pointing at the full image
pub fn viewer_page(server_uri: &str) -> String {
    format!(
        r#"<html><head><meta property="og:image" content="{}/big/cover.jpg"></head><body></body></html>"#,
        server_uri
    )
}

/// The cover URL a resolved viewer page yields, forced to https
pub fn expected_cover(server_uri: &str) -> String {
    format!("{}/big/cover.jpg", server_uri).replacen("http://", "https://", 1)
}
