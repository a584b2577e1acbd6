//! Detail enrichment and cover resolution against a mock tracker

use crate::common::{detail_page, expected_cover, html, topic_processor, viewer_page, TOPIC_PATH};
use chrono::{TimeZone, Utc};
use forum_harvest::{ImageProcessor, RequestManager, TopicStub};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stub(server_uri: &str, topic_id: &str) -> TopicStub {
    TopicStub::new(
        topic_id,
        format!("Game {}", topic_id),
        format!("{}{}?t={}", server_uri, TOPIC_PATH, topic_id),
        "ps2",
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_process_topic_details_resolves_cover() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .and(query_param("t", "101"))
        .respond_with(html(&detail_page(&server.uri(), "1,25 gb")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fastpic.ru/view/cover.html"))
        .respond_with(html(&viewer_page(&server.uri())))
        .mount(&server)
        .await;

    let requests = Arc::new(RequestManager::new(None).unwrap());
    let processor = topic_processor(&requests);

    let topic = processor
        .process_topic_details(&stub(&server.uri(), "101"))
        .await
        .unwrap();

    assert!(topic.is_enriched());
    assert_eq!(topic.cover(), Some(expected_cover(&server.uri()).as_str()));
    assert_eq!(topic.magnet(), Some("magnet:?xt=urn:btih:0123456789abcdef"));
    assert_eq!(topic.size(), Some("1,25 GB"));
}

#[tokio::test]
async fn test_missing_post_body_is_detail_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .respond_with(html("<html><body><p>Topic removed</p></body></html>"))
        .mount(&server)
        .await;

    let requests = Arc::new(RequestManager::new(None).unwrap());
    let error = topic_processor(&requests)
        .process_topic_details(&stub(&server.uri(), "7"))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("post body not found"));
}

#[tokio::test]
async fn test_batch_keeps_failed_topic_as_stub() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .and(query_param("t", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TOPIC_PATH))
        .respond_with(html(&detail_page(&server.uri(), "700.5 MB")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fastpic.ru/view/cover.html"))
        .respond_with(html(&viewer_page(&server.uri())))
        .mount(&server)
        .await;

    let requests = Arc::new(RequestManager::new(None).unwrap());
    let processor = topic_processor(&requests);
    let stubs: Vec<TopicStub> = ["1", "2", "3"]
        .iter()
        .map(|id| stub(&server.uri(), id))
        .collect();

    let reported = std::cell::RefCell::new(Vec::new());
    let topics = processor
        .process_topics_batch_with_progress(stubs.clone(), |done, total| {
            reported.borrow_mut().push((done, total));
        })
        .await;

    assert_eq!(topics.len(), 3);
    let ids: Vec<&str> = topics.iter().map(|t| t.topic_id()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    assert!(topics[0].is_enriched());
    assert_eq!(topics[0].size(), Some("700.5 MB"));
    assert!(!topics[1].is_enriched());
    assert_eq!(topics[1].stub, stubs[1]);
    assert!(topics[2].is_enriched());

    let mut reported = reported.into_inner();
    reported.sort();
    assert_eq!(reported, vec![(1, 3), (2, 3), (3, 3)]);

    // The unenriched record serializes as the bare stub
    let json = serde_json::to_value(&topics[1]).unwrap();
    assert!(json.get("size").is_none());
    assert_eq!(json["topicId"], "2");
}

#[tokio::test]
async fn test_cover_falls_through_failing_viewers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fastpic.org/view/gone.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/imageban.ru/show/empty.html"))
        .respond_with(html("<html><body>no image here</body></html>"))
        .mount(&server)
        .await;

    let requests = Arc::new(RequestManager::new(None).unwrap());
    let images = ImageProcessor::new(requests).with_resolve_delay(Duration::ZERO);

    let uri = server.uri();
    let candidates = vec![
        format!("{}/fastpic.org/view/gone.html", uri),
        format!("{}/imageban.ru/show/empty.html", uri),
        format!("{}/direct/cover.jpg", uri),
    ];
    assert_eq!(
        images.resolve_cover(&candidates).await,
        Some(format!("{}/direct/cover.jpg", uri).replacen("http://", "https://", 1))
    );

    assert_eq!(images.resolve_cover(&candidates[..2]).await, None);
}

#[tokio::test]
async fn test_only_three_candidates_are_tried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let requests = Arc::new(RequestManager::new(None).unwrap());
    let images = ImageProcessor::new(requests).with_resolve_delay(Duration::ZERO);

    let uri = server.uri();
    let candidates = vec![
        format!("{}/fastpic.ru/a.html", uri),
        format!("{}/fastpic.ru/b.html", uri),
        format!("{}/fastpic.ru/c.html", uri),
        format!("{}/direct/fourth.jpg", uri),
    ];

    assert_eq!(images.resolve_cover(&candidates).await, None);
}
