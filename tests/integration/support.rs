//! Shared fixtures for the integration tests

use chrono::{Duration, Utc};
use note_harvest::config::Config;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SEARCH_PATH: &str = "/api/fe_api/burdock/v3/search/notes";
pub const COMMENT_PATH: &str = "/api/sns/web/v2/comment/page";

/// Creates a test configuration pointed at the mock server with pacing disabled
pub fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.fetcher.api_base = base_url.to_string();
    config.fetcher.request_delay_ms = 0; // No pacing in tests
    config.fetcher.jitter = 0.0;
    config.fetcher.timeout_secs = 5;
    config.scheduler.poll_interval_ms = 20;
    config
}

/// Offset-aware timestamp `days_ago` days before now
pub fn timestamp(days_ago: i64) -> String {
    (Utc::now() - Duration::days(days_ago))
        .format("%Y-%m-%dT%H:%M:%S%z")
        .to_string()
}

/// A recent normal note with the given comment count
pub fn note(id: &str, comment_count: u64) -> Value {
    json!({
        "id": id,
        "title": format!("title {}", id),
        "desc": format!("description of {}", id),
        "liked_count": 10,
        "collected_count": 2,
        "comment_count": comment_count,
        "time": timestamp(3),
        "type": "normal",
        "image_list": [format!("https://img.example/{}.jpg", id)]
    })
}

pub fn search_page(notes: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": { "notes": notes } }))
}

pub fn comment_page(comments: Vec<Value>, cursor: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({ "data": { "comments": comments, "cursor": cursor } }))
}

pub fn comment(id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "like_count": 1,
        "user_info": { "nickname": format!("user-{}", id) }
    })
}

/// Answers every comment request with an empty page
pub async fn mount_empty_comments(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .respond_with(comment_page(vec![], ""))
        .mount(server)
        .await;
}

pub fn keywords(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}
