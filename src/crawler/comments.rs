//! Cursor-paginated comment retrieval for one record

use crate::crawler::extractor::{count, first_present, identifier, sanitize_text};
use crate::crawler::fetcher::{CrawlSession, FetchResult, Fetcher};
use crate::crawler::record::Comment;
use crate::HarvestError;
use serde_json::Value;
use url::Url;

/// Fixed number of comments requested per page
pub const COMMENT_PAGE_SIZE: u32 = 20;

/// Hard cap on comments attached to one record
pub const MAX_COMMENTS_PER_RECORD: usize = 20;

/// Normalizes one raw comment, dropping it when the content sanitizes to nothing
pub fn parse_comment(raw: &Value) -> Option<Comment> {
    let content = raw
        .get("content")
        .and_then(Value::as_str)
        .map(sanitize_text)
        .unwrap_or_default();
    if content.is_empty() {
        return None;
    }

    let author_display_name = raw
        .get("user_info")
        .and_then(|user| user.get("nickname"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(Comment {
        id: ["id", "comment_id"]
            .iter()
            .filter_map(|key| raw.get(*key))
            .find_map(identifier),
        author_display_name,
        content,
        liked_count: count(first_present(raw, &["like_count", "liked_count"])),
    })
}

/// Splits a comment page into its raw comments and the next cursor
fn comment_page(body: &Value) -> (&[Value], Option<&str>) {
    let data = body.get("data");
    let items = data
        .and_then(|d| d.get("comments"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let cursor = data
        .and_then(|d| d.get("cursor"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty());
    (items, cursor)
}

/// Fetches up to `limit` sanitized comments for `record_id`
///
/// Stops when the limit is reached, a page has no comments, or the next cursor
/// is empty. A failed request ends the walk: comments gathered so far are
/// returned, and if none were gathered the failure is reported as an error.
pub async fn fetch_comments(
    fetcher: &Fetcher,
    session: &CrawlSession,
    comment_url: &Url,
    record_id: &str,
    limit: usize,
) -> Result<Vec<Comment>, HarvestError> {
    let mut comments = Vec::new();
    let mut cursor = String::new();

    while comments.len() < limit {
        let params = [
            ("note_id", record_id.to_string()),
            ("cursor", cursor.clone()),
            ("page_size", COMMENT_PAGE_SIZE.to_string()),
        ];

        let body = match fetcher.fetch_json(session, comment_url, &params).await {
            FetchResult::Success(body) => body,
            failure if comments.is_empty() => {
                return Err(HarvestError::Transport {
                    url: comment_url.to_string(),
                    message: failure.to_string(),
                });
            }
            failure => {
                tracing::debug!(
                    "record={} comment page failed after {} comments: {}",
                    record_id,
                    comments.len(),
                    failure
                );
                break;
            }
        };

        let (items, next_cursor) = comment_page(&body);
        if items.is_empty() {
            break;
        }

        for raw in items {
            if let Some(comment) = parse_comment(raw) {
                comments.push(comment);
            }
            if comments.len() >= limit {
                break;
            }
        }

        match next_cursor {
            Some(next) => cursor = next.to_string(),
            None => break,
        }
    }

    Ok(comments)
}
