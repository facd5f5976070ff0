//! Canonical record types produced by a crawl

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record type of ordinary image/text notes; anything else is filtered out
pub const NORMAL_RECORD_TYPE: &str = "normal";

/// Publish time of a record
///
/// Upstream timestamps either carry an offset or are naive wall-clock values.
/// Naive values are compared against local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishTime {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl PublishTime {
    /// Returns true if this time is no older than `months` (30-day months) before `now`
    pub fn is_within_months(&self, months: u32, now: DateTime<Utc>) -> bool {
        let window = Duration::days(30 * i64::from(months));
        match self {
            Self::Zoned(time) => *time >= now.with_timezone(time.offset()) - window,
            Self::Naive(time) => {
                let local_now = now.with_timezone(&Local).naive_local();
                *time >= local_now - window
            }
        }
    }
}

impl fmt::Display for PublishTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoned(time) => write!(f, "{}", time.to_rfc3339()),
            Self::Naive(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A single sanitized comment attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Upstream comment identifier, when the API supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub author_display_name: String,
    pub content: String,
    pub liked_count: u64,
}

/// Canonical crawled post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub description: String,
    pub liked_count: u64,
    pub collected_count: u64,
    pub commented_count: u64,
    pub publish_time: Option<PublishTime>,
    /// Ordered, deduplicated, no empty entries
    pub image_urls: Vec<String>,
    pub record_type: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Record {
    /// Returns true for ordinary notes (not video or ads)
    pub fn is_normal(&self) -> bool {
        self.record_type == NORMAL_RECORD_TYPE
    }

    /// Returns true if the record has a publish time inside the recency window
    ///
    /// Records without a publish time never qualify.
    pub fn is_recent(&self, months: u32, now: DateTime<Utc>) -> bool {
        self.publish_time
            .map(|time| time.is_within_months(months, now))
            .unwrap_or(false)
    }
}
