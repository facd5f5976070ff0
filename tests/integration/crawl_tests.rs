//! End-to-end keyword crawls against a mock upstream

use crate::support::*;
use note_harvest::crawler::crawl;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_crawl_ranks_by_comments_and_honors_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("keyword", "coffee"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "20"))
        .respond_with(search_page(vec![note("n1", 1), note("n2", 9), note("n3", 4)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![note("n4", 7), note("n5", 100)]))
        .mount(&mock_server)
        .await;

    mount_empty_comments(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let results = crawl(&config, &keywords(&["coffee"]), 4).await.unwrap();

    let ids: Vec<_> = results["coffee"].iter().map(|r| r.id.as_str()).collect();
    // n5 is never reached: the limit fills on page 2's first item
    assert_eq!(ids, vec!["n2", "n4", "n3", "n1"]);

    let top = &results["coffee"][0];
    assert_eq!(top.title, "title n2");
    assert_eq!(top.description, "description of n2");
    assert_eq!(top.image_urls, vec!["https://img.example/n2.jpg"]);
}

#[tokio::test]
async fn test_crawl_stops_on_empty_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(search_page(vec![note("n1", 3)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_empty_comments(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let results = crawl(&config, &keywords(&["coffee"]), 50).await.unwrap();

    assert_eq!(results["coffee"].len(), 1);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_crawl_filters_stale_non_normal_and_unidentified_notes() {
    let mock_server = MockServer::start().await;

    let mut stale = note("stale", 50);
    stale["time"] = json!(timestamp(400));
    let mut video = note("video", 50);
    video["type"] = json!("video");
    let mut anonymous = note("ignored", 50);
    anonymous.as_object_mut().unwrap().remove("id");
    let mut undated = note("undated", 50);
    undated.as_object_mut().unwrap().remove("time");

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(search_page(vec![
            stale,
            video,
            anonymous,
            undated,
            note("kept", 1),
        ]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .mount(&mock_server)
        .await;

    mount_empty_comments(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let results = crawl(&config, &keywords(&["coffee"]), 10).await.unwrap();

    let ids: Vec<_> = results["coffee"].iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["kept"]);
}

#[tokio::test]
async fn test_comments_are_capped_and_sanitized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(search_page(vec![note("n1", 40)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .mount(&mock_server)
        .await;

    let mut first: Vec<_> = (0..15)
        .map(|i| comment(&format!("a{}", i), &format!("first page {}", i)))
        .collect();
    first[0] = comment("a0", "  hello\u{7}   \tworld  ");
    first[1] = comment("a1", "\u{1}\u{2}  ");

    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .and(query_param("note_id", "n1"))
        .and(query_param("cursor", ""))
        .respond_with(comment_page(first, "next"))
        .mount(&mock_server)
        .await;

    let second: Vec<_> = (0..15)
        .map(|i| comment(&format!("b{}", i), &format!("second page {}", i)))
        .collect();

    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .and(query_param("note_id", "n1"))
        .and(query_param("cursor", "next"))
        .respond_with(comment_page(second, "more"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let results = crawl(&config, &keywords(&["coffee"]), 5).await.unwrap();
    let comments = &results["coffee"][0].comments;

    assert_eq!(comments.len(), 20);
    assert_eq!(comments[0].content, "hello world");
    assert_eq!(comments[0].author_display_name, "user-a0");
    assert_eq!(comments[0].id.as_deref(), Some("a0"));
    // The blank comment is dropped, so the second page starts at index 14
    assert_eq!(comments[13].content, "first page 14");
    assert_eq!(comments[14].content, "second page 0");
    assert!(comments.iter().all(|c| !c.content.is_empty()));
}

#[tokio::test]
async fn test_comment_failure_leaves_record_without_comments() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(search_page(vec![note("broken", 9), note("fine", 1)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .and(query_param("note_id", "broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .and(query_param("note_id", "fine"))
        .respond_with(comment_page(vec![comment("c1", "great")], ""))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let results = crawl(&config, &keywords(&["coffee"]), 10).await.unwrap();
    let records = &results["coffee"];

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "broken");
    assert!(records[0].comments.is_empty());
    assert_eq!(records[1].comments.len(), 1);
}

#[tokio::test]
async fn test_failed_search_yields_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let results = crawl(&config, &keywords(&["coffee", "tea"]), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results["coffee"].is_empty());
    assert!(results["tea"].is_empty());
}

#[tokio::test]
async fn test_page_retries_recover_from_transient_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(search_page(vec![note("n1", 1)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .mount(&mock_server)
        .await;

    mount_empty_comments(&mock_server).await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawler.page_retries = 1;
    let results = crawl(&config, &keywords(&["coffee"]), 10).await.unwrap();

    assert_eq!(results["coffee"].len(), 1);
}

#[tokio::test]
async fn test_cookie_header_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .and(header("cookie", "a1=xyz; web_session=abc"))
        .respond_with(search_page(vec![note("n1", 1)]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .mount(&mock_server)
        .await;

    mount_empty_comments(&mock_server).await;

    let mut config = create_test_config(&mock_server.uri());
    config.fetcher.cookies = Some("a1=xyz; web_session=abc".to_string());
    let with_cookie = crawl(&config, &keywords(&["coffee"]), 10).await.unwrap();
    assert_eq!(with_cookie["coffee"].len(), 1);

    config.fetcher.cookies = None;
    let without_cookie = crawl(&config, &keywords(&["coffee"]), 10).await.unwrap();
    assert!(without_cookie["coffee"].is_empty());
}
