//! End-to-end category crawls against a mock tracker

use crate::common::{
    category, detail_page, expected_cover, html, listing, scraper, settings, viewer_page,
    write_categories, LAST_PAGE, LISTING_PATH, TOPIC_PATH,
};
use forum_harvest::{Stage, Topic};
use std::cell::RefCell;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn read_store(dir: &std::path::Path, id: &str) -> Vec<Topic> {
    let raw = std::fs::read_to_string(dir.join("data").join(format!("{}.json", id))).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Page 1 lists two matching topics and one foreign row, page 2 is the end
async fn mount_two_page_category(server: &MockServer) {
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "50"))
        .respond_with(html(LAST_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(&listing(&[
            ("101", "[PS2] Okami [2006, Action]"),
            ("102", "[PS2] Ico [2001, Adventure]"),
            ("103", "[PSP] Patapon [2008]"),
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .and(query_param("t", "101"))
        .respond_with(html(&detail_page(&uri, "1,25 GB")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .and(query_param("t", "102"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fastpic.ru/view/cover.html"))
        .respond_with(html(&viewer_page(&uri)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_all_crawls_enriches_and_deduplicates() {
    let server = MockServer::start().await;
    mount_two_page_category(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &server.uri());
    write_categories(&settings.config_dir, &[category(&server.uri(), "ps2", "[PS2]")]);

    let mut scraper = scraper(settings);

    let stages = RefCell::new(Vec::new());
    let observer = |event: &forum_harvest::ProgressEvent<'_>| {
        stages.borrow_mut().push((event.page, event.stage));
    };

    let report = scraper.run_all(Some(&observer), Some(10)).await;
    assert!(report.success);
    assert!(report.all_succeeded());

    let result = &report.categories["ps2"];
    let stats = result.stats.unwrap();
    assert_eq!(stats.pages_processed, 2);
    assert_eq!(stats.new_topics_found, 2);
    assert_eq!(stats.duplicates_skipped, 0);
    assert_eq!(stats.new_items, 2);
    assert_eq!(stats.total_in_file, 2);

    let store = read_store(dir.path(), "ps2");
    assert_eq!(store.len(), 2);

    let okami = store.iter().find(|t| t.topic_id() == "101").unwrap();
    assert_eq!(okami.stub.title, "Okami");
    assert_eq!(okami.cover(), Some(expected_cover(&server.uri()).as_str()));
    assert_eq!(okami.size(), Some("1,25 GB"));
    assert!(okami.magnet().is_some());

    let ico = store.iter().find(|t| t.topic_id() == "102").unwrap();
    assert!(!ico.is_enriched());
    assert_eq!(ico.stub.url, format!("{}{}?t=102", server.uri(), TOPIC_PATH));

    let stages = stages.into_inner();
    assert_eq!(stages.first(), Some(&(0, Stage::LoadStore)));
    assert!(stages.contains(&(1, Stage::Continue)));
    assert!(stages.contains(&(2, Stage::LastPage)));
    assert_eq!(stages.last(), Some(&(2, Stage::Done)));
    assert_eq!(scraper.requests().cache_size(), 0);

    // Second run finds nothing new and never refetches details
    let report = scraper.run_all(None, Some(10)).await;
    let stats = report.categories["ps2"].stats.unwrap();
    assert_eq!(stats.new_topics_found, 0);
    assert_eq!(stats.duplicates_skipped, 2);
    assert_eq!(stats.new_items, 0);
    assert_eq!(stats.total_in_file, 2);
    assert_eq!(read_store(dir.path(), "ps2").len(), 2);
}

#[tokio::test]
async fn test_page_error_advances_and_cap_stops_crawl() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "100"))
        .respond_with(html(LAST_PAGE))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "50"))
        .respond_with(html(&listing(&[("201", "[PS2] Rez [2001]")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .respond_with(html(&detail_page(&uri, "3.5 GB")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fastpic.ru/view/cover.html"))
        .respond_with(html(&viewer_page(&uri)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &uri);
    write_categories(&settings.config_dir, &[category(&uri, "ps2", "[PS2]")]);

    let mut scraper = scraper(settings);
    let result = scraper.run_category("ps2", None, Some(2)).await;

    assert!(result.success);
    let stats = result.stats.unwrap();
    assert_eq!(stats.pages_processed, 2);
    assert_eq!(stats.new_items, 1);

    let store = read_store(dir.path(), "ps2");
    assert_eq!(store.len(), 1);
    assert_eq!(store[0].size(), Some("3.5 GB"));
}

#[tokio::test]
async fn test_hard_ceiling_stops_at_page_130() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "6500"))
        .respond_with(html(LAST_PAGE))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(&listing(&[])))
        .expect(130)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &server.uri());
    write_categories(&settings.config_dir, &[category(&server.uri(), "ps2", "[PS2]")]);

    let mut scraper = scraper(settings);
    let result = scraper.run_category("ps2", None, Some(200)).await;

    assert!(result.success);
    assert_eq!(result.stats.unwrap().pages_processed, 130);
}

#[tokio::test]
async fn test_disabled_category_is_not_found() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &server.uri());

    let mut disabled = category(&server.uri(), "wii", "[Wii]");
    disabled.enabled = false;
    write_categories(
        &settings.config_dir,
        &[category(&server.uri(), "ps2", "[PS2]"), disabled],
    );

    let mut scraper = scraper(settings);
    let result = scraper.run_category("wii", None, Some(1)).await;

    assert!(!result.success);
    assert!(result.stats.is_none());
    assert!(result.error.unwrap().contains("not found or disabled"));
}

#[tokio::test]
async fn test_failing_category_does_not_stop_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "50"))
        .respond_with(html(LAST_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(&listing(&[
            ("301", "[PSP] Lumines [2004]"),
            ("302", "[PS2] Katamari Damacy [2004]"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &server.uri());
    write_categories(
        &settings.config_dir,
        &[
            category(&server.uri(), "psp", "[PSP]"),
            category(&server.uri(), "ps2", "[PS2]"),
        ],
    );

    // A directory where the psp store should be makes its save fail
    std::fs::create_dir_all(dir.path().join("data").join("psp.json")).unwrap();

    let mut scraper = scraper(settings);
    let report = scraper.run_all(None, Some(3)).await;

    assert!(report.success);
    assert_eq!(report.failed_categories(), vec!["psp"]);
    assert!(report.categories["psp"].error.is_some());

    let ps2 = &report.categories["ps2"];
    assert!(ps2.success);
    assert_eq!(ps2.stats.unwrap().total_in_file, 1);
    assert_eq!(read_store(dir.path(), "ps2")[0].topic_id(), "302");
}

#[tokio::test]
async fn test_refresh_only_crawls_stored_categories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(LAST_PAGE))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &server.uri());
    write_categories(
        &settings.config_dir,
        &[
            category(&server.uri(), "ps2", "[PS2]"),
            category(&server.uri(), "psp", "[PSP]"),
        ],
    );
    std::fs::create_dir_all(&settings.data_dir).unwrap();
    std::fs::write(settings.data_dir.join("psp.json"), "[]").unwrap();

    let mut scraper = scraper(settings);
    let report = scraper.refresh_existing(None, Some(1)).await.unwrap();

    let ids: Vec<&String> = report.categories.keys().collect();
    assert_eq!(ids, vec!["psp"]);
    assert!(report.categories["psp"].success);
}

#[tokio::test]
async fn test_connection_reports_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "<html><head><title>Tracker :: Index</title></head><body></body></html>",
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let scraper = scraper(settings(dir.path(), &server.uri()));

    let report = scraper.test_connection().await;
    assert!(report.success);
    assert_eq!(report.title.as_deref(), Some("Tracker :: Index"));
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let scraper = scraper(settings(dir.path(), &server.uri()));

    let report = scraper.test_connection().await;
    assert!(!report.success);
    assert!(report.error.is_some());
}
