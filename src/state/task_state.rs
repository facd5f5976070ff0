//! Task state definitions for tracking keyword crawls
//!
//! A task moves `Pending -> Running -> {Success, Failed}`. Terminal tasks only
//! return to `Pending` through a fresh enqueue.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a keyword task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting to be picked up by the scheduler
    Pending,

    /// A worker is crawling the keyword
    Running,

    /// Crawl finished and results are stored
    Success,

    /// Crawl raised an error; see the task's error message
    Failed,
}

impl TaskStatus {
    /// Returns true if a task in this state blocks a new enqueue of its keyword
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// One unit of scheduling work, keyed by keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub keyword: String,
    pub status: TaskStatus,
    pub requested_limit: usize,
    pub error: Option<String>,
    /// Number of times the keyword has been put into `Pending`
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task
    pub fn new(keyword: impl Into<String>, requested_limit: usize) -> Self {
        let now = Utc::now();
        Self {
            keyword: keyword.into(),
            status: TaskStatus::Pending,
            requested_limit,
            error: None,
            attempts: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Puts a terminal task back into `Pending` with a new limit
    pub fn reset(&mut self, requested_limit: usize) {
        self.status = TaskStatus::Pending;
        self.requested_limit = requested_limit;
        self.error = None;
        self.attempts += 1;
        self.updated_at = Utc::now();
    }

    pub(crate) fn transition(&mut self, status: TaskStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.updated_at = Utc::now();
    }
}
