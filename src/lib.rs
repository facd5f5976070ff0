//! Note-Harvest: a keyword-driven note crawler
//!
//! This crate turns search keywords into enriched note records (posts plus their
//! top comments) fetched from a rate-limited upstream API, and schedules that work
//! so many keywords can be crawled concurrently without duplicating in-flight work.

pub mod config;
pub mod crawler;
pub mod harvester;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Note-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Crawl of '{keyword}' timed out after {seconds}s")]
    CrawlTimeout { keyword: String, seconds: u64 },

    #[error("worker panicked: {0}")]
    WorkerPanic(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid environment override {name}={value}")]
    InvalidOverride { name: String, value: String },
}

/// Result type alias for Note-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Comment, Coordinator, PublishTime, Record};
pub use harvester::Harvester;
pub use state::{Task, TaskStatus, TaskStore};
