use serde::Deserialize;
use std::time::Duration;

/// Default catalog root
pub const DEFAULT_BASE_URL: &str = "https://books.toscrape.com/";

/// Upper bound for the default worker pool size
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Main configuration structure for Catalog-Crawler
///
/// Every section and key has a default, so an empty file (or no file at all)
/// yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Root URL of the catalog; listing page 1 lives here
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of parallel item workers
    pub workers: usize,

    /// Hard upper bound for a single item page fetch (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Hard upper bound for a single listing page fetch (seconds)
    #[serde(rename = "listing-timeout-secs")]
    pub listing_timeout_secs: u64,

    /// How long a worker waits on an empty work queue before re-checking (milliseconds)
    #[serde(rename = "queue-wait-ms")]
    pub queue_wait_ms: u64,

    /// How long the aggregator waits for the next outcome before giving up (seconds)
    #[serde(rename = "collect-timeout-secs")]
    pub collect_timeout_secs: u64,

    /// How long to wait for workers to exit once aggregation ends (seconds)
    #[serde(rename = "shutdown-grace-secs")]
    pub shutdown_grace_secs: u64,

    /// Number of successful records between checkpoints
    #[serde(rename = "checkpoint-interval")]
    pub checkpoint_interval: usize,

    /// Capacity of the result queue
    #[serde(rename = "result-buffer")]
    pub result_buffer: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            workers: default_workers(),
            fetch_timeout_secs: 5,
            listing_timeout_secs: 10,
            queue_wait_ms: 2_000,
            collect_timeout_secs: 30,
            shutdown_grace_secs: 5,
            checkpoint_interval: 20,
            result_buffer: 64,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn queue_wait(&self) -> Duration {
        Duration::from_millis(self.queue_wait_ms)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// `min(4, available parallelism)`, falling back to 1 when the platform
/// cannot report its parallelism
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(DEFAULT_MAX_WORKERS)
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "CatalogCrawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value: `Name/Version`
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the timestamped JSON file is written into
    pub directory: String,

    /// File name prefix, followed by `_<timestamp>.json`
    #[serde(rename = "file-prefix")]
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "data".to_string(),
            file_prefix: "books".to_string(),
        }
    }
}
