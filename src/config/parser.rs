use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use note_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Comment limit: {}", config.crawler.comment_limit);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config)?;

    validate(&config)?;

    Ok(config)
}

/// Parses TOML content into a configuration without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies overrides from the process environment
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Applies overrides resolved through `lookup`
///
/// | Variable | Setting |
/// |----------|---------|
/// | `XHS_COOKIES` | `fetcher.cookies` |
/// | `CRAWLER_DELAY` | `fetcher.request-delay-ms` (given in seconds) |
/// | `COMMENT_LIMIT` | `crawler.comment-limit` |
/// | `SCHEDULER_CONCURRENCY` | `scheduler.concurrency` |
/// | `SCHEDULER_POLL_INTERVAL` | `scheduler.poll-interval-ms` (given in seconds) |
pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cookies) = lookup("XHS_COOKIES") {
        if !cookies.trim().is_empty() {
            config.fetcher.cookies = Some(cookies);
        }
    }

    if let Some(value) = lookup("CRAWLER_DELAY") {
        config.fetcher.request_delay_ms = seconds_to_millis("CRAWLER_DELAY", &value)?;
    }

    if let Some(value) = lookup("COMMENT_LIMIT") {
        config.crawler.comment_limit = parse_number("COMMENT_LIMIT", &value)?;
    }

    if let Some(value) = lookup("SCHEDULER_CONCURRENCY") {
        config.scheduler.concurrency = parse_number("SCHEDULER_CONCURRENCY", &value)?;
    }

    if let Some(value) = lookup("SCHEDULER_POLL_INTERVAL") {
        config.scheduler.poll_interval_ms = seconds_to_millis("SCHEDULER_POLL_INTERVAL", &value)?;
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
        })
}

fn seconds_to_millis(name: &str, value: &str) -> Result<u64, ConfigError> {
    let seconds: f64 = parse_number(name, value)?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ConfigError::InvalidOverride {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok((seconds * 1000.0).round() as u64)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
