//! Search pagination for a single keyword
//!
//! Pages are requested in order and every item is extracted, filtered and
//! appended until the target count is reached or a page comes back empty.
//! The accumulated records are then ranked by comment count.

use crate::crawler::extractor::extract_record;
use crate::crawler::fetcher::{CrawlSession, FetchResult, Fetcher};
use crate::crawler::record::Record;
use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

/// Fixed number of items requested per search page
pub const SEARCH_PAGE_SIZE: u32 = 20;

/// Filter applied to every extracted record
#[derive(Debug, Clone, Copy)]
pub struct RecordFilter {
    /// Size of the trailing recency window
    pub recency_months: u32,
    /// Reference instant for the recency window
    pub now: DateTime<Utc>,
}

impl RecordFilter {
    /// Returns true if the record is a normal note inside the recency window
    pub fn accepts(&self, record: &Record) -> bool {
        record.is_normal() && record.is_recent(self.recency_months, self.now)
    }
}

/// Extracts the raw post list from a search response
///
/// An absent or malformed list is an empty page.
pub fn search_items(body: &Value) -> &[Value] {
    body.get("data")
        .and_then(|data| data.get("notes"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Sorts by comment count descending, keeping fetch order on ties, then truncates
pub fn rank_records(mut records: Vec<Record>, limit: usize) -> Vec<Record> {
    records.sort_by(|a, b| b.commented_count.cmp(&a.commented_count));
    records.truncate(limit);
    records
}

/// Drives paged search requests for one keyword
pub struct Paginator<'a> {
    fetcher: &'a Fetcher,
    session: &'a CrawlSession,
    search_url: &'a Url,
    page_retries: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        session: &'a CrawlSession,
        search_url: &'a Url,
        page_retries: u32,
    ) -> Self {
        Self {
            fetcher,
            session,
            search_url,
            page_retries,
        }
    }

    /// Collects up to `limit` qualifying records for `keyword`
    ///
    /// # Termination
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | `limit` records accepted | Stop |
    /// | Page returns zero items | Stop (exhausted) |
    /// | Page request fails | Retry up to `page_retries` times, then stop |
    pub async fn collect(&self, keyword: &str, limit: usize, filter: RecordFilter) -> Vec<Record> {
        let mut records = Vec::new();
        let mut page: u32 = 1;

        while records.len() < limit {
            let body = match self.fetch_page(keyword, page).await {
                Some(body) => body,
                None => break,
            };

            let items = search_items(&body);
            if items.is_empty() {
                tracing::debug!("keyword={} page={} returned no items", keyword, page);
                break;
            }

            for item in items {
                let Some(record) = extract_record(item) else {
                    continue;
                };
                if !filter.accepts(&record) {
                    tracing::trace!("keyword={} dropped record {}", keyword, record.id);
                    continue;
                }
                records.push(record);
                if records.len() >= limit {
                    break;
                }
            }

            page += 1;
        }

        let records = rank_records(records, limit);
        tracing::info!("keyword={} fetched={}", keyword, records.len());
        records
    }

    /// Fetches one page, retrying failed requests
    ///
    /// Returns `None` once the retries are used up.
    async fn fetch_page(&self, keyword: &str, page: u32) -> Option<Value> {
        let params = [
            ("keyword", keyword.to_string()),
            ("page", page.to_string()),
            ("page_size", SEARCH_PAGE_SIZE.to_string()),
        ];

        let mut attempt = 0;
        loop {
            match self.fetcher.fetch_json(self.session, self.search_url, &params).await {
                FetchResult::Success(body) => return Some(body),
                failure if attempt < self.page_retries => {
                    attempt += 1;
                    tracing::debug!(
                        "keyword={} page={} failed ({}), retry {}/{}",
                        keyword,
                        page,
                        failure,
                        attempt,
                        self.page_retries
                    );
                }
                failure => {
                    tracing::warn!(
                        "keyword={} page={} failed ({}), stopping pagination early",
                        keyword,
                        page,
                        failure
                    );
                    return None;
                }
            }
        }
    }
}
