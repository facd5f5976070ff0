//! Fetcher limits and failure handling against a mock upstream

use crate::support::*;
use note_harvest::crawler::{crawl, fetch_comments, CrawlSession, FetchResult, Fetcher};
use note_harvest::HarvestError;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Records when each request reaches the server, then answers after `delay`
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(200)
            .set_body_json(json!({ "data": { "notes": [] } }))
            .set_delay(self.delay)
    }
}

/// Fires three requests at once through one fetcher and returns the arrival times
async fn three_concurrent_fetches(concurrency: u32, max_connections: u32) -> Vec<Instant> {
    let mock_server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ArrivalRecorder {
            arrivals: Arc::clone(&arrivals),
            delay: Duration::from_millis(300),
        })
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.concurrency = concurrency;
    config.fetcher.max_connections = max_connections;

    let fetcher = Fetcher::new(&config.fetcher);
    let session = CrawlSession::new(&config.fetcher).unwrap();
    let url = Url::parse(&format!("{}{}", mock_server.uri(), SEARCH_PATH)).unwrap();
    let params = [("keyword", "coffee".to_string())];

    let (a, b, c) = tokio::join!(
        fetcher.fetch_json(&session, &url, &params),
        fetcher.fetch_json(&session, &url, &params),
        fetcher.fetch_json(&session, &url, &params),
    );
    for result in [a, b, c] {
        assert!(!result.is_failure(), "{}", result);
    }

    let mut times = arrivals.lock().unwrap().clone();
    times.sort();
    times
}

#[tokio::test]
async fn test_single_slot_serializes_requests() {
    let arrivals = three_concurrent_fetches(1, 50).await;

    assert_eq!(arrivals.len(), 3);
    for pair in arrivals.windows(2) {
        // Each request waits for the previous response to finish
        assert!(pair[1] - pair[0] >= Duration::from_millis(250));
    }
}

#[tokio::test]
async fn test_connection_cap_serializes_requests() {
    let arrivals = three_concurrent_fetches(5, 1).await;

    assert_eq!(arrivals.len(), 3);
    for pair in arrivals.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(250));
    }
}

#[tokio::test]
async fn test_open_slots_let_requests_overlap() {
    let arrivals = three_concurrent_fetches(3, 3).await;

    assert_eq!(arrivals.len(), 3);
    assert!(arrivals[2] - arrivals[0] < Duration::from_millis(250));
}

#[tokio::test]
async fn test_timeout_degrades_to_failure_value() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "notes": [note("n1", 1)] } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.timeout_secs = 1;

    let fetcher = Fetcher::new(&config.fetcher);
    let session = CrawlSession::new(&config.fetcher).unwrap();
    let url = Url::parse(&format!("{}{}", mock_server.uri(), SEARCH_PATH)).unwrap();

    let started = Instant::now();
    let result = fetcher
        .fetch_json(&session, &url, &[("keyword", "coffee".to_string())])
        .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        result,
        FetchResult::NetworkError {
            timed_out: true,
            ..
        }
    ));
    assert_eq!(result.into_json(), json!({}));

    // Pagination treats the timed-out page as the end of results
    let results = crawl(&config, &keywords(&["coffee"]), 10).await.unwrap();
    assert!(results["coffee"].is_empty());
}

#[tokio::test]
async fn test_comment_failure_error_is_plain_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let fetcher = Fetcher::new(&config.fetcher);
    let session = CrawlSession::new(&config.fetcher).unwrap();
    let url = Url::parse(&format!("{}{}", mock_server.uri(), COMMENT_PATH)).unwrap();

    let error = fetch_comments(&fetcher, &session, &url, "n1", 20)
        .await
        .unwrap_err();

    match error {
        HarvestError::Transport { message, .. } => assert_eq!(message, "HTTP 500"),
        other => panic!("unexpected error: {}", other),
    }
}
