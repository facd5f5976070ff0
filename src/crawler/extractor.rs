//! Note extraction and text normalization
//!
//! This module turns one raw search-result item into a canonical [`Record`]:
//! - Identifier lookup under alternate field names (items without one are rejected)
//! - Control-character stripping and whitespace collapsing for free text
//! - Count resolution with alternate field names, defaulting to 0
//! - Publish time parsing across several timestamp layouts
//! - Order-preserving image URL deduplication

use crate::crawler::record::{PublishTime, Record, NORMAL_RECORD_TYPE};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;

const ID_FIELDS: &[&str] = &["id", "note_id"];
const LIKED_FIELDS: &[&str] = &["liked_count", "like_count"];
const COLLECTED_FIELDS: &[&str] = &["collected_count", "fav_count"];
const COMMENTED_FIELDS: &[&str] = &["comment_count", "comments_count"];
const TIME_FIELDS: &[&str] = &["time", "publish_time", "create_time"];
const TYPE_FIELDS: &[&str] = &["type", "note_type"];
const IMAGE_FIELDS: &[&str] = &["image_list", "images"];

/// Epoch values above this are taken to be milliseconds
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Removes ASCII control characters, collapses whitespace runs and trims
///
/// # Example
///
/// ```
/// use note_harvest::crawler::sanitize_text;
///
/// assert_eq!(sanitize_text("  a\x07b   c\n"), "ab c");
/// ```
pub fn sanitize_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deduplicates image URLs, keeping first-seen order and dropping empty entries
pub fn dedup_images<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for url in urls {
        let url = url.into();
        if url.is_empty() || !seen.insert(url.clone()) {
            continue;
        }
        result.push(url);
    }

    result
}

/// Parses a textual publish time
///
/// Layouts are tried in order; the first that parses wins:
/// 1. `%Y-%m-%dT%H:%M:%S%z` (offset-aware, `Z` accepted as UTC)
/// 2. `%Y-%m-%d %H:%M:%S`
/// 3. `%Y-%m-%d`
pub fn parse_publish_time(text: &str) -> Option<PublishTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(time) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(text))
    {
        return Some(PublishTime::Zoned(time));
    }

    if let Ok(time) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(PublishTime::Naive(time));
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(PublishTime::Naive)
}

/// Parses a publish time that may be a string or an epoch number
fn publish_time_from_value(value: &Value) -> Option<PublishTime> {
    match value {
        Value::String(text) => parse_publish_time(text),
        Value::Number(number) => {
            let raw = number.as_i64()?;
            let time = if raw > EPOCH_MILLIS_THRESHOLD {
                DateTime::<Utc>::from_timestamp_millis(raw)?
            } else {
                DateTime::<Utc>::from_timestamp(raw, 0)?
            };
            Some(PublishTime::Zoned(time.fixed_offset()))
        }
        _ => None,
    }
}

/// Returns the first non-null field among `keys`
pub(crate) fn first_present<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find(|value| !value.is_null())
}

/// Reads a non-empty identifier from a string or numeric field
pub(crate) fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Reads a count from a JSON number or numeric string, defaulting to 0
pub(crate) fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn text_field(item: &Value, keys: &[&str]) -> String {
    first_present(item, keys)
        .and_then(Value::as_str)
        .map(sanitize_text)
        .unwrap_or_default()
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => Some(url.clone()),
        Value::Object(_) => value.get("url").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Normalizes one raw search item into a record
///
/// Returns `None` when the item has no identifier. Comments are left empty.
pub fn extract_record(item: &Value) -> Option<Record> {
    if !item.is_object() {
        return None;
    }

    let id = ID_FIELDS
        .iter()
        .filter_map(|key| item.get(*key))
        .find_map(identifier)?;

    let image_urls = dedup_images(
        IMAGE_FIELDS
            .iter()
            .filter_map(|key| item.get(*key).and_then(Value::as_array))
            .flatten()
            .filter_map(image_url),
    );

    let record_type = first_present(item, TYPE_FIELDS)
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())
        .unwrap_or(NORMAL_RECORD_TYPE)
        .to_string();

    Some(Record {
        id,
        title: text_field(item, &["title"]),
        description: text_field(item, &["desc", "description"]),
        liked_count: count(first_present(item, LIKED_FIELDS)),
        collected_count: count(first_present(item, COLLECTED_FIELDS)),
        commented_count: count(first_present(item, COMMENTED_FIELDS)),
        publish_time: first_present(item, TIME_FIELDS).and_then(publish_time_from_value),
        image_urls,
        record_type,
        comments: Vec::new(),
    })
}
