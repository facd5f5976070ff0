use crate::config::types::{
    Config, CrawlerConfig, FetcherConfig, OutputConfig, SchedulerConfig,
};
use crate::crawler::MAX_COMMENTS_PER_RECORD;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_crawler_config(&config.crawler)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates upstream access configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "api-base '{}' must use http or https",
            config.api_base
        )));
    }

    validate_endpoint_path("search-path", &config.search_path)?;
    validate_endpoint_path("comment-path", &config.comment_path)?;

    validate_range("fetcher.concurrency", config.concurrency, 1, 100)?;
    validate_range("fetcher.max-connections", config.max_connections, 1, 1000)?;

    if !(0.0..1.0).contains(&config.jitter) {
        return Err(ConfigError::Validation(format!(
            "jitter must be in [0, 1), got {}",
            config.jitter
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.comment_limit < 1 || config.comment_limit > MAX_COMMENTS_PER_RECORD {
        return Err(ConfigError::Validation(format!(
            "comment-limit must be between 1 and {}, got {}",
            MAX_COMMENTS_PER_RECORD, config.comment_limit
        )));
    }

    if config.recency_months < 1 {
        return Err(ConfigError::Validation(
            "recency-months must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates task scheduling configuration
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    validate_range("scheduler.concurrency", config.concurrency, 1, 100)?;

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be > 0".to_string(),
        ));
    }

    if config.crawl_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "crawl-timeout-secs must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if matches!(config.database_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if matches!(config.results_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "results-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_range(name: &str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Endpoint paths are joined onto api-base and must be absolute
fn validate_endpoint_path(name: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} must start with '/', got '{}'",
            name, path
        )));
    }
    Ok(())
}
