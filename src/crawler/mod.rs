//! Crawler module for keyword search and comment retrieval
//!
//! This module contains the core crawling logic, including:
//! - Rate-limited HTTP fetching with randomized pacing
//! - Note extraction and text normalization
//! - Search pagination with recency and type filtering
//! - Cursor-paginated comment retrieval
//! - Keyword batch orchestration
//! - Task scheduling with bounded concurrency

mod comments;
mod coordinator;
mod extractor;
mod fetcher;
mod paginator;
mod record;
mod scheduler;

pub use comments::{fetch_comments, parse_comment, COMMENT_PAGE_SIZE, MAX_COMMENTS_PER_RECORD};
pub use coordinator::{CommentOutcome, Coordinator, Endpoints};
pub use extractor::{dedup_images, extract_record, parse_publish_time, sanitize_text};
pub use fetcher::{
    build_headers, build_http_client, random_delay, CrawlSession, FetchResult, Fetcher,
    USER_AGENTS,
};
pub use paginator::{rank_records, search_items, Paginator, RecordFilter, SEARCH_PAGE_SIZE};
pub use record::{Comment, PublishTime, Record, NORMAL_RECORD_TYPE};
pub use scheduler::{HttpKeywordCrawler, KeywordCrawler, Scheduler};

use crate::config::Config;
use crate::HarvestError;
use std::collections::HashMap;

/// Runs a one-off crawl of `keywords` without the scheduler
///
/// # Returns
///
/// * `Ok(HashMap)` - keyword -> ranked records with comments attached
/// * `Err(HarvestError)` - The HTTP client or endpoints could not be built
pub async fn crawl(
    config: &Config,
    keywords: &[String],
    limit: usize,
) -> Result<HashMap<String, Vec<Record>>, HarvestError> {
    let coordinator = Coordinator::new(config.fetcher.clone(), config.crawler.clone())?;
    coordinator.crawl_keywords(keywords, limit).await
}
