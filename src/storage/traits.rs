//! Storage traits and error types
//!
//! This module defines the trait interface for persistence sinks and
//! associated error types.

use crate::crawler::{Comment, Record};
use crate::state::TaskStatus;
use crate::storage::{KeywordRecord, SinkStatistics};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Lock,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable destination for crawl output
///
/// Keyed by keyword, record id and comment id.
pub trait RecordSink: Send {
    // ===== Keywords =====

    /// Creates the keyword row if missing and sets its status
    ///
    /// # Returns
    ///
    /// The keyword row id
    fn upsert_keyword(&mut self, keyword: &str, status: TaskStatus) -> StorageResult<i64>;

    /// Gets a keyword row
    fn get_keyword(&self, keyword: &str) -> StorageResult<Option<KeywordRecord>>;

    // ===== Records =====

    /// Saves the result of a successful crawl
    ///
    /// Records are upserted by id, their comments replaced, and the keyword is
    /// marked successful with its note count and crawl time.
    ///
    /// # Returns
    ///
    /// Number of records written
    fn save_records(&mut self, keyword: &str, records: &[Record]) -> StorageResult<usize>;

    /// Gets a record with its comments
    fn get_record(&self, record_id: &str) -> StorageResult<Option<Record>>;

    /// Updates the engagement counters of a stored record
    fn update_record_counts(
        &mut self,
        record_id: &str,
        liked: u64,
        collected: u64,
        commented: u64,
    ) -> StorageResult<()>;

    /// Gets the records last saved for a keyword, ranked by comment count
    fn records_for_keyword(&self, keyword: &str) -> StorageResult<Vec<Record>>;

    /// Finds records whose title or description contains `text`
    fn search_records(&self, text: &str, limit: usize) -> StorageResult<Vec<Record>>;

    // ===== Comments =====

    /// Gets a comment by its upstream id
    fn get_comment(&self, comment_id: &str) -> StorageResult<Option<Comment>>;

    /// Gets the comments of a record in stored order
    fn comments_for_record(&self, record_id: &str) -> StorageResult<Vec<Comment>>;

    // ===== Statistics =====

    /// Counts stored keywords, records and comments
    fn statistics(&self) -> StorageResult<SinkStatistics>;
}
