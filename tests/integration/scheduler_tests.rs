//! Scheduled crawls through the Harvester context

use crate::support::*;
use note_harvest::state::TaskStatus;
use note_harvest::storage::{RecordSink, SqliteSink};
use note_harvest::Harvester;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer};

/// Serves one note per keyword on page 1 and an empty page 2
async fn mount_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "1"))
        .respond_with(search_page(vec![note("n1", 5), note("n2", 8)]))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(search_page(vec![]))
        .mount(server)
        .await;
}

async fn settle(harvester: &Harvester, keywords: &[String]) {
    tokio::time::timeout(
        Duration::from_secs(10),
        harvester.wait_until_settled(keywords, Duration::from_millis(20)),
    )
    .await
    .expect("keywords did not settle");
}

#[tokio::test]
async fn test_enqueue_skips_keywords_already_pending() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server).await;
    mount_empty_comments(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let mut harvester = Harvester::from_config(&config).unwrap();

    // Scheduler not started yet, so "a" stays pending
    let first = harvester.enqueue(&keywords(&["a"]), 10).await;
    assert_eq!(first.created, vec!["a"]);

    let second = harvester.enqueue(&keywords(&["a", "b"]), 10).await;
    assert_eq!(second.created, vec!["b"]);
    assert_eq!(second.skipped, vec!["a"]);

    harvester.start();
    settle(&harvester, &keywords(&["a", "b"])).await;
    harvester.shutdown().await;

    let tasks = harvester.list_tasks().await;
    let order: Vec<_> = tasks.iter().map(|t| t.keyword.as_str()).collect();
    assert_eq!(order, vec!["a", "b"]);
    assert!(tasks.iter().all(|t| t.status == TaskStatus::Success));

    let result = harvester.get_result("b").await.unwrap();
    let ids: Vec<_> = result.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["n2", "n1"]);
}

#[tokio::test]
async fn test_reenqueue_after_success_runs_again() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server).await;
    mount_empty_comments(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.start();

    let all = keywords(&["coffee"]);
    harvester.enqueue(&all, 1).await;
    settle(&harvester, &all).await;
    assert_eq!(harvester.get_result("coffee").await.unwrap().len(), 1);

    let again = harvester.enqueue(&all, 2).await;
    assert_eq!(again.created, all);
    settle(&harvester, &all).await;
    harvester.shutdown().await;

    let task = harvester.store().get("coffee").await.unwrap();
    assert_eq!(task.status, TaskStatus::Success);
    assert_eq!(task.attempts, 2);
    assert_eq!(task.requested_limit, 2);
    assert_eq!(harvester.get_result("coffee").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_results_are_persisted_to_sqlite() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server).await;

    Mock::given(method("GET"))
        .and(path(COMMENT_PATH))
        .and(query_param("note_id", "n2"))
        .respond_with(comment_page(vec![comment("c1", "love it")], ""))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    mount_empty_comments(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    let mut config = create_test_config(&mock_server.uri());
    config.output.database_path = Some(db_path.to_string_lossy().into_owned());

    let mut harvester = Harvester::from_config(&config).unwrap();
    harvester.start();
    let all = keywords(&["coffee"]);
    harvester.enqueue(&all, 10).await;
    settle(&harvester, &all).await;
    harvester.shutdown().await;
    drop(harvester);

    let sink = SqliteSink::new(&db_path).unwrap();
    let stored = sink.records_for_keyword("coffee").unwrap();
    let ids: Vec<_> = stored.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["n2", "n1"]);
    assert_eq!(stored[0].comments.len(), 1);

    let keyword = sink.get_keyword("coffee").unwrap().unwrap();
    assert_eq!(keyword.status, TaskStatus::Success);
    assert_eq!(keyword.total_notes, 2);
    assert_eq!(sink.get_comment("c1").unwrap().unwrap().content, "love it");
}
