//! Rate-limited HTTP fetcher
//!
//! This module handles all upstream requests for the crawler, including:
//! - Building the per-batch HTTP client and connection cap
//! - A per-crawler concurrency cap on in-flight calls
//! - Randomized pacing before every request
//! - Header randomization (user agent rotation) and session credentials
//! - Error classification without ever raising to the caller

use crate::config::FetcherConfig;
use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, COOKIE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Desktop user agents rotated across requests
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
];

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9";
const CONNECTION_VALUE: &str = "keep-alive";

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// HTTP 200 with a JSON body
    Success(Value),

    /// Any non-200 status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Timeout, connection failure or undecodable body
    NetworkError {
        /// Error description
        error: String,
        /// Whether the request hit the timeout
        timed_out: bool,
    },
}

impl FetchResult {
    /// Returns true if the request failed at the transport or HTTP level
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Success(_))
    }

    /// Degrades any failure to an empty JSON object
    pub fn into_json(self) -> Value {
        match self {
            Self::Success(body) => body,
            _ => Value::Object(Map::new()),
        }
    }
}

impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(_) => f.write_str("success"),
            Self::HttpError { status_code } => write!(f, "HTTP {}", status_code),
            Self::NetworkError {
                timed_out: true, ..
            } => f.write_str("request timed out"),
            Self::NetworkError { error, .. } => write!(f, "network error: {}", error),
        }
    }
}

/// HTTP resources shared by every request of one crawl batch
///
/// Holds the connection pool and caps the number of connections open at once,
/// independently of the per-crawler request limiter.
#[derive(Clone)]
pub struct CrawlSession {
    client: Client,
    connections: Arc<Semaphore>,
}

impl CrawlSession {
    /// Builds a session from the fetcher configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            connections: Arc::new(Semaphore::new(config.max_connections as usize)),
        })
    }

    /// Returns the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Builds an HTTP client with the connection pool sized for one batch
///
/// Per-request timeouts are applied by [`Fetcher`], not here.
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .pool_max_idle_per_host(config.max_connections as usize)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Picks a user agent from [`USER_AGENTS`]
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Builds request headers with a rotated user agent and optional cookie string
pub fn build_headers(cookies: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(CONNECTION, HeaderValue::from_static(CONNECTION_VALUE));

    if let Some(cookies) = cookies.filter(|c| !c.is_empty()) {
        match HeaderValue::from_str(cookies) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(_) => tracing::warn!("Cookie string contains invalid header characters, not sent"),
        }
    }

    headers
}

/// Draws a delay uniformly from `[base * (1 - jitter), base * (1 + jitter)]`
pub fn random_delay(base: Duration, jitter: f64) -> Duration {
    let base_secs = base.as_secs_f64();
    if base_secs <= 0.0 {
        return Duration::ZERO;
    }

    let low = (base_secs * (1.0 - jitter)).max(0.0);
    let high = base_secs * (1.0 + jitter);
    if high <= low {
        return Duration::from_secs_f64(low);
    }

    Duration::from_secs_f64(rand::rng().random_range(low..=high))
}

/// Issues paced upstream calls under a fixed concurrency cap
pub struct Fetcher {
    semaphore: Semaphore,
    base_delay: Duration,
    jitter: f64,
    timeout: Duration,
    cookies: Option<String>,
}

impl Fetcher {
    /// Creates a fetcher with its own request limiter
    pub fn new(config: &FetcherConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.concurrency as usize),
            base_delay: Duration::from_millis(config.request_delay_ms),
            jitter: config.jitter,
            timeout: Duration::from_secs(config.timeout_secs),
            cookies: config.cookies.clone(),
        }
    }

    /// Fetches `url` with `params` and decodes the JSON body
    ///
    /// Holds one slot of the request limiter for the pacing delay plus the call.
    /// Failures are logged and returned as values, never raised.
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 200, JSON body | `Success` |
    /// | Other status | `HttpError` |
    /// | Timeout | `NetworkError { timed_out: true }` |
    /// | Connection or decode failure | `NetworkError { timed_out: false }` |
    pub async fn fetch_json(
        &self,
        session: &CrawlSession,
        url: &Url,
        params: &[(&str, String)],
    ) -> FetchResult {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return FetchResult::NetworkError {
                    error: "request limiter closed".to_string(),
                    timed_out: false,
                }
            }
        };

        tokio::time::sleep(random_delay(self.base_delay, self.jitter)).await;

        let _connection = match session.connections.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return FetchResult::NetworkError {
                    error: "connection pool closed".to_string(),
                    timed_out: false,
                }
            }
        };

        let request = session
            .client
            .get(url.clone())
            .query(params)
            .headers(build_headers(self.cookies.as_deref()))
            .timeout(self.timeout);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_error(url, e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!("Request failed {} status={}", url, status.as_u16());
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        match response.json::<Value>().await {
            Ok(body) => FetchResult::Success(body),
            Err(e) => classify_error(url, e),
        }
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchResult {
    if error.is_timeout() {
        tracing::error!("Request timeout {}", url);
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
        }
    } else {
        tracing::error!("Request error {}: {}", url, error);
        FetchResult::NetworkError {
            error: error.to_string(),
            timed_out: false,
        }
    }
}
