//! Polling scheduler for keyword tasks
//!
//! This module handles:
//! - Polling the task store for pending keywords
//! - Global concurrency limiting of keyword crawls via a semaphore
//! - Recording success, failure, timeout and worker panics back into the store
//! - Handing successful results to the persistence sink
//! - Graceful shutdown that lets in-flight workers finish

use crate::config::{CrawlerConfig, FetcherConfig, SchedulerConfig};
use crate::crawler::coordinator::Coordinator;
use crate::crawler::record::Record;
use crate::state::{Task, TaskStatus, TaskStore};
use crate::storage::SharedSink;
use crate::HarvestError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// Something that can crawl one keyword into a ranked record list
pub trait KeywordCrawler: Send + Sync + 'static {
    fn crawl_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Record>, HarvestError>> + Send;
}

/// Crawls a keyword over HTTP with a fresh [`Coordinator`] per call
#[derive(Debug, Clone)]
pub struct HttpKeywordCrawler {
    fetcher: FetcherConfig,
    crawler: CrawlerConfig,
}

impl HttpKeywordCrawler {
    pub fn new(fetcher: FetcherConfig, crawler: CrawlerConfig) -> Self {
        Self { fetcher, crawler }
    }
}

impl KeywordCrawler for HttpKeywordCrawler {
    fn crawl_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Record>, HarvestError>> + Send {
        let keyword = keyword.to_string();
        let fetcher = self.fetcher.clone();
        let crawler = self.crawler.clone();

        async move {
            let coordinator = Coordinator::new(fetcher, crawler)?;
            let mut results = coordinator
                .crawl_keywords(std::slice::from_ref(&keyword), limit)
                .await?;
            Ok(results.remove(&keyword).unwrap_or_default())
        }
    }
}

/// Producer-consumer loop that drains pending tasks under bounded concurrency
pub struct Scheduler<C: KeywordCrawler> {
    store: Arc<TaskStore>,
    crawler: Arc<C>,
    sink: Option<SharedSink>,
    config: SchedulerConfig,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl<C: KeywordCrawler> Scheduler<C> {
    /// Creates a scheduler; call [`Scheduler::start`] to begin polling
    pub fn new(
        store: Arc<TaskStore>,
        crawler: C,
        sink: Option<SharedSink>,
        config: SchedulerConfig,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            store,
            crawler: Arc::new(crawler),
            sink,
            config,
            stop_tx,
            handle: None,
        }
    }

    /// Returns true while the polling loop is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawns the polling loop if it is not already running
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.stop_tx.send_replace(false);
        let worker_loop = WorkerLoop {
            store: Arc::clone(&self.store),
            crawler: Arc::clone(&self.crawler),
            sink: self.sink.clone(),
            concurrency: self.config.concurrency as usize,
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            crawl_timeout: self.config.crawl_timeout_secs.map(Duration::from_secs),
            stop_rx: self.stop_tx.subscribe(),
        };

        self.handle = Some(tokio::spawn(worker_loop.run()));
        tracing::info!(
            "TaskScheduler started with concurrency={}",
            self.config.concurrency
        );
    }

    /// Stops polling and waits for in-flight workers to finish
    pub async fn shutdown(&mut self) {
        self.stop_tx.send_replace(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler loop ended abnormally: {}", e);
            }
        }
        tracing::info!("TaskScheduler stopped");
    }
}

/// State owned by the spawned polling loop
struct WorkerLoop<C: KeywordCrawler> {
    store: Arc<TaskStore>,
    crawler: Arc<C>,
    sink: Option<SharedSink>,
    concurrency: usize,
    poll_interval: Duration,
    crawl_timeout: Option<Duration>,
    stop_rx: watch::Receiver<bool>,
}

impl<C: KeywordCrawler> WorkerLoop<C> {
    async fn run(mut self) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        while !*self.stop_rx.borrow() {
            let pending = self.store.take_pending(self.concurrency * 2).await;
            if !pending.is_empty() {
                self.run_cycle(pending, &semaphore).await;
            }
            if !self.idle().await {
                break;
            }
        }
    }

    /// Waits one poll interval, waking early on shutdown
    ///
    /// Returns false once the scheduler handle is gone.
    async fn idle(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => true,
            changed = self.stop_rx.changed() => changed.is_ok(),
        }
    }

    /// Starts one worker per task and joins all of them
    async fn run_cycle(&self, pending: Vec<Task>, semaphore: &Arc<Semaphore>) {
        let mut workers = JoinSet::new();
        let mut keywords = HashMap::new();

        for task in pending {
            self.store.mark_running(&task.keyword).await;
            tracing::debug!("keyword={} pending -> running", task.keyword);

            let worker = Worker {
                store: Arc::clone(&self.store),
                crawler: Arc::clone(&self.crawler),
                sink: self.sink.clone(),
                semaphore: Arc::clone(semaphore),
                crawl_timeout: self.crawl_timeout,
            };
            let keyword = task.keyword.clone();
            let handle = workers.spawn(worker.run(task));
            keywords.insert(handle.id(), keyword);
        }

        while let Some(joined) = workers.join_next_with_id().await {
            if let Err(e) = joined {
                let Some(keyword) = keywords.remove(&e.id()) else {
                    continue;
                };
                let message = HarvestError::WorkerPanic(panic_message(e)).to_string();
                tracing::error!("crawl failed keyword={} err={}", keyword, message);
                self.store.mark_failed(&keyword, message).await;
                if let Some(sink) = &self.sink {
                    record_failure(sink, &keyword);
                }
            }
        }
    }
}

/// One keyword crawl
struct Worker<C: KeywordCrawler> {
    store: Arc<TaskStore>,
    crawler: Arc<C>,
    sink: Option<SharedSink>,
    semaphore: Arc<Semaphore>,
    crawl_timeout: Option<Duration>,
}

impl<C: KeywordCrawler> Worker<C> {
    async fn run(self, task: Task) {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                self.store
                    .mark_failed(&task.keyword, "worker limiter closed")
                    .await;
                return;
            }
        };

        let keyword = task.keyword.as_str();
        match self.crawl(keyword, task.requested_limit).await {
            Ok(records) => {
                tracing::info!("crawl success keyword={} count={}", keyword, records.len());
                if let Some(sink) = &self.sink {
                    persist(sink, keyword, &records);
                }
                self.store.mark_success(keyword, records).await;
            }
            Err(e) => {
                tracing::error!("crawl failed keyword={} err={}", keyword, e);
                if let Some(sink) = &self.sink {
                    record_failure(sink, keyword);
                }
                self.store.mark_failed(keyword, e.to_string()).await;
            }
        }
    }

    async fn crawl(&self, keyword: &str, limit: usize) -> Result<Vec<Record>, HarvestError> {
        let crawl = self.crawler.crawl_keyword(keyword, limit);
        match self.crawl_timeout {
            Some(timeout) => tokio::time::timeout(timeout, crawl)
                .await
                .map_err(|_| HarvestError::CrawlTimeout {
                    keyword: keyword.to_string(),
                    seconds: timeout.as_secs(),
                })?,
            None => crawl.await,
        }
    }
}

/// Extracts the panic payload text from a failed worker
fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(error) => error.to_string(),
    }
}

fn persist(sink: &SharedSink, keyword: &str, records: &[Record]) {
    let saved = sink
        .lock()
        .map_err(|_| crate::storage::StorageError::Lock)
        .and_then(|mut sink| sink.save_records(keyword, records));
    match saved {
        Ok(count) => tracing::debug!("keyword={} persisted {} records", keyword, count),
        Err(e) => tracing::error!("keyword={} persistence failed: {}", keyword, e),
    }
}

fn record_failure(sink: &SharedSink, keyword: &str) {
    let updated = sink
        .lock()
        .map_err(|_| crate::storage::StorageError::Lock)
        .and_then(|mut sink| sink.upsert_keyword(keyword, TaskStatus::Failed));
    if let Err(e) = updated {
        tracing::error!("keyword={} failed to record failure: {}", keyword, e);
    }
}
