//! Crawler coordinator - keyword batch orchestration
//!
//! This module sequences the crawl of one or more keywords:
//! - Building one connection pool for the whole batch
//! - Running pagination for each keyword in turn
//! - Fetching comments for each collected record, one record at a time
//! - Absorbing per-record comment failures so a keyword always completes

use crate::config::{CrawlerConfig, FetcherConfig};
use crate::crawler::comments::{fetch_comments, MAX_COMMENTS_PER_RECORD};
use crate::crawler::fetcher::{CrawlSession, Fetcher};
use crate::crawler::paginator::{Paginator, RecordFilter};
use crate::crawler::record::{Comment, Record};
use crate::HarvestError;
use chrono::Utc;
use std::collections::HashMap;
use url::Url;

/// Resolved upstream endpoints
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub search: Url,
    pub comments: Url,
}

impl Endpoints {
    /// Joins the configured paths onto the API base
    pub fn from_config(config: &FetcherConfig) -> Result<Self, HarvestError> {
        let base = Url::parse(&config.api_base)?;
        Ok(Self {
            search: base.join(&config.search_path)?,
            comments: base.join(&config.comment_path)?,
        })
    }
}

/// Outcome of fetching one record's comments
#[derive(Debug)]
pub enum CommentOutcome {
    Fetched(Vec<Comment>),
    Failed(HarvestError),
}

impl CommentOutcome {
    /// Comments to attach to the record; empty on failure
    pub fn into_comments(self) -> Vec<Comment> {
        match self {
            Self::Fetched(mut comments) => {
                comments.truncate(MAX_COMMENTS_PER_RECORD);
                comments
            }
            Self::Failed(_) => Vec::new(),
        }
    }
}

/// Main crawl orchestrator
///
/// Each coordinator owns a [`Fetcher`], so its request limiter is private to
/// the crawls it runs.
pub struct Coordinator {
    fetcher_config: FetcherConfig,
    crawler_config: CrawlerConfig,
    fetcher: Fetcher,
    endpoints: Endpoints,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Endpoints resolved
    /// * `Err(HarvestError)` - The API base or paths do not form valid URLs
    pub fn new(
        fetcher_config: FetcherConfig,
        crawler_config: CrawlerConfig,
    ) -> Result<Self, HarvestError> {
        let endpoints = Endpoints::from_config(&fetcher_config)?;
        let fetcher = Fetcher::new(&fetcher_config);

        Ok(Self {
            fetcher_config,
            crawler_config,
            fetcher,
            endpoints,
        })
    }

    /// Crawls each keyword in order and returns keyword -> ranked records
    ///
    /// For every keyword:
    /// 1. Paginate search results up to `limit` qualifying records
    /// 2. Fetch comments for each record sequentially, after all records are collected
    pub async fn crawl_keywords(
        &self,
        keywords: &[String],
        limit: usize,
    ) -> Result<HashMap<String, Vec<Record>>, HarvestError> {
        let session = CrawlSession::new(&self.fetcher_config)?;
        let mut results = HashMap::new();

        for keyword in keywords {
            let records = self.crawl_keyword(&session, keyword, limit).await;
            results.insert(keyword.clone(), records);
        }

        Ok(results)
    }

    /// Crawls a single keyword inside an existing session
    pub async fn crawl_keyword(
        &self,
        session: &CrawlSession,
        keyword: &str,
        limit: usize,
    ) -> Vec<Record> {
        let filter = RecordFilter {
            recency_months: self.crawler_config.recency_months,
            now: Utc::now(),
        };

        let paginator = Paginator::new(
            &self.fetcher,
            session,
            &self.endpoints.search,
            self.crawler_config.page_retries,
        );
        let mut records = paginator.collect(keyword, limit, filter).await;

        for record in records.iter_mut() {
            let outcome = self.record_comments(session, &record.id).await;
            if let CommentOutcome::Failed(e) = &outcome {
                tracing::error!("fetch_comments failed record_id={} err={}", record.id, e);
            }
            record.comments = outcome.into_comments();
        }

        records
    }

    async fn record_comments(&self, session: &CrawlSession, record_id: &str) -> CommentOutcome {
        match fetch_comments(
            &self.fetcher,
            session,
            &self.endpoints.comments,
            record_id,
            self.crawler_config.comment_limit,
        )
        .await
        {
            Ok(comments) => CommentOutcome::Fetched(comments),
            Err(e) => CommentOutcome::Failed(e),
        }
    }
}
