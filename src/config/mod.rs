//! Configuration module for Note-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! then layering environment overrides on top.
//!
//! # Example
//!
//! ```no_run
//! use note_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Scheduler concurrency: {}", config.scheduler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetcherConfig, OutputConfig, SchedulerConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, apply_overrides, compute_config_hash, load_config,
    load_config_with_hash, parse_config,
};
pub use validation::validate;
