//! RequestManager behaviour against a mock server

use crate::common::html;
use encoding_rs::WINDOWS_1251;
use forum_harvest::RequestManager;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_repeated_fetch_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html("<p>cached</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();
    let url = format!("{}/page", server.uri());

    let first = requests.fetch(&url).await.unwrap();
    let second = requests.fetch(&url).await.unwrap();

    assert_eq!(first, "<p>cached</p>");
    assert_eq!(first, second);
    assert_eq!(requests.cache_size(), 1);

    requests.clear_cache();
    assert_eq!(requests.cache_size(), 0);
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>once</p>").set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();
    let url = format!("{}/slow", server.uri());

    let (first, second, third) =
        tokio::join!(requests.fetch(&url), requests.fetch(&url), requests.fetch(&url));

    assert_eq!(first.unwrap(), "<p>once</p>");
    assert_eq!(second.unwrap(), "<p>once</p>");
    assert_eq!(third.unwrap(), "<p>once</p>");
    assert_eq!(requests.cache_size(), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(html("<p>back</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();
    let url = format!("{}/flaky", server.uri());

    assert!(requests.fetch(&url).await.is_err());
    assert_eq!(requests.cache_size(), 0);
    assert_eq!(requests.fetch(&url).await.unwrap(), "<p>back</p>");
    assert_eq!(requests.cache_size(), 1);
}

#[tokio::test]
async fn test_single_forbidden_is_retried_with_navigation_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .and(header("Sec-Fetch-Mode", "navigate"))
        .respond_with(html("<p>let in</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();
    let body = requests
        .fetch(&format!("{}/guarded", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "<p>let in</p>");
}

#[tokio::test]
async fn test_double_forbidden_fails_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();
    let error = requests
        .fetch(&format!("{}/blocked", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(403));
    assert_eq!(requests.cache_size(), 0);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();
    let error = requests
        .fetch(&format!("{}/broken", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(500));
}

#[tokio::test]
async fn test_windows_1251_bodies_decode() {
    let server = MockServer::start().await;
    let text = "<p>Подходящих тем или сообщений не найдено</p>";
    let (encoded, _, _) = WINDOWS_1251.encode(text);

    Mock::given(method("GET"))
        .and(path("/declared"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(encoded.to_vec(), "text/html; charset=windows-1251"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/undeclared"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(encoded.to_vec(), "text/html"))
        .mount(&server)
        .await;

    let requests = RequestManager::new(None).unwrap();

    let declared = requests
        .fetch(&format!("{}/declared", server.uri()))
        .await
        .unwrap();
    let undeclared = requests
        .fetch(&format!("{}/undeclared", server.uri()))
        .await
        .unwrap();

    assert_eq!(declared, text);
    assert_eq!(undeclared, text);
}
