//! Harvester context
//!
//! Owns the task store, the scheduler and the optional persistence sink, and
//! exposes the operations callers use to drive keyword crawls.

use crate::config::Config;
use crate::crawler::{HttpKeywordCrawler, KeywordCrawler, Record, Scheduler};
use crate::state::{EnqueueOutcome, Task, TaskStore};
use crate::storage::{open_sink, SharedSink};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Explicitly constructed crawler context
pub struct Harvester<C: KeywordCrawler = HttpKeywordCrawler> {
    store: Arc<TaskStore>,
    scheduler: Scheduler<C>,
    sink: Option<SharedSink>,
}

impl Harvester<HttpKeywordCrawler> {
    /// Builds a harvester that crawls over HTTP
    ///
    /// Opens the SQLite sink when `output.database-path` is configured.
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let sink = match &config.output.database_path {
            Some(path) => {
                tracing::info!("Opening database: {}", path);
                Some(open_sink(Path::new(path))?)
            }
            None => None,
        };

        let crawler = HttpKeywordCrawler::new(config.fetcher.clone(), config.crawler.clone());
        Ok(Self::with_crawler(crawler, sink, config))
    }
}

impl<C: KeywordCrawler> Harvester<C> {
    /// Builds a harvester around any keyword crawler
    pub fn with_crawler(crawler: C, sink: Option<SharedSink>, config: &Config) -> Self {
        let store = Arc::new(TaskStore::new());
        let scheduler = Scheduler::new(
            Arc::clone(&store),
            crawler,
            sink.clone(),
            config.scheduler.clone(),
        );

        Self {
            store,
            scheduler,
            sink,
        }
    }

    /// Starts the scheduler loop
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// Stops the scheduler and waits for in-flight crawls
    pub async fn shutdown(&mut self) {
        self.scheduler.shutdown().await;
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Enqueues keywords; pending or running keywords are skipped
    pub async fn enqueue(&self, keywords: &[String], limit: usize) -> EnqueueOutcome {
        let outcome = self.store.add(keywords, limit).await;
        tracing::info!(
            "Enqueued {} keyword(s), skipped {} already in flight",
            outcome.created.len(),
            outcome.skipped.len()
        );
        outcome
    }

    /// Returns all tasks in insertion order
    pub async fn list_tasks(&self) -> Vec<Task> {
        self.store.snapshot().await
    }

    /// Returns the latest successful result set for a keyword
    pub async fn get_result(&self, keyword: &str) -> Option<Vec<Record>> {
        self.store.result_of(keyword).await
    }

    /// Polls until every named keyword has a terminal task
    ///
    /// Keywords without a task are ignored.
    pub async fn wait_until_settled(&self, keywords: &[String], poll: Duration) {
        loop {
            let mut settled = true;
            for keyword in keywords {
                if let Some(task) = self.store.get(keyword).await {
                    if !task.status.is_terminal() {
                        settled = false;
                        break;
                    }
                }
            }
            if settled {
                return;
            }
            tokio::time::sleep(poll).await;
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn sink(&self) -> Option<&SharedSink> {
        self.sink.as_ref()
    }
}
