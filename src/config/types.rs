use serde::Deserialize;

/// Main configuration structure for Note-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Upstream access configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Scheme and host of the upstream API
    #[serde(rename = "api-base")]
    pub api_base: String,

    /// Path of the note search endpoint
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Path of the comment page endpoint
    #[serde(rename = "comment-path")]
    pub comment_path: String,

    /// Session cookie string sent with every request, if any
    pub cookies: Option<String>,

    /// Base delay before each request (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Relative jitter applied to the base delay
    pub jitter: f64,

    /// Maximum number of in-flight requests per crawler
    pub concurrency: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum number of open connections for one crawl batch
    #[serde(rename = "max-connections")]
    pub max_connections: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.xiaohongshu.com".to_string(),
            search_path: "/api/fe_api/burdock/v3/search/notes".to_string(),
            comment_path: "/api/sns/web/v2/comment/page".to_string(),
            cookies: None,
            request_delay_ms: 1000,
            jitter: 0.3,
            concurrency: 5,
            timeout_secs: 15,
            max_connections: 50,
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of comments kept per record
    #[serde(rename = "comment-limit")]
    pub comment_limit: usize,

    /// Records older than this many months are dropped
    #[serde(rename = "recency-months")]
    pub recency_months: u32,

    /// Extra attempts for a search page whose request failed
    #[serde(rename = "page-retries")]
    pub page_retries: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            comment_limit: 20,
            recency_months: 6,
            page_retries: 0,
        }
    }
}

/// Task scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of keywords crawled at the same time
    pub concurrency: u32,

    /// Wait between polls of the task store (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single keyword crawl (seconds)
    #[serde(rename = "crawl-timeout-secs")]
    pub crawl_timeout_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            poll_interval_ms: 2000,
            crawl_timeout_secs: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database receiving crawled records
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,

    /// Path of the JSON export written after a CLI run
    #[serde(rename = "results-path")]
    pub results_path: Option<String>,
}
