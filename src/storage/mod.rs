//! Storage module for persisting crawl output
//!
//! This module is the durable side of the crawler:
//! - SQLite database initialization and schema management
//! - Keyword status tracking
//! - Record and comment persistence keyed by upstream ids
//! - Lookup and search for previously crawled records

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteSink;
pub use traits::{RecordSink, StorageError, StorageResult};

use crate::state::TaskStatus;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Sink shared between scheduler workers
pub type SharedSink = Arc<Mutex<dyn RecordSink>>;

/// Opens a SQLite sink ready to be shared with the scheduler
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SharedSink)` - Successfully opened sink
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_sink(path: &Path) -> StorageResult<SharedSink> {
    let sink = SqliteSink::new(path)?;
    Ok(Arc::new(Mutex::new(sink)))
}

/// Represents a keyword in the database
#[derive(Debug, Clone)]
pub struct KeywordRecord {
    pub id: i64,
    pub keyword: String,
    pub status: TaskStatus,
    pub total_notes: u64,
    pub last_crawl_time: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Row counts of a sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStatistics {
    pub keywords: u64,
    pub failed_keywords: u64,
    pub records: u64,
    pub comments: u64,
}
