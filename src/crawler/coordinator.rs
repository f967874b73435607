//! Crawler coordinator - ties discovery and orchestration together
//!
//! A run has two phases:
//! 1. Walk every listing page in order and collect item URLs
//! 2. Hand the URLs to the [`Orchestrator`], which fetches and extracts them
//!    in parallel and checkpoints the records as it goes

use crate::config::{validate, Config};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::listing::{collect_item_urls, Discovery};
use crate::crawler::orchestrator::{Orchestrator, OrchestratorSettings, RunSummary};
use crate::output::prepare_output_path;
use crate::CrawlError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub discovery: Discovery,
    pub run: RunSummary,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    base_url: Url,
    output_path: PathBuf,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `output_path` - Where checkpoints are written
    pub fn new(config: Config, output_path: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent)?;
        Self::with_fetcher(config, Arc::new(fetcher), output_path)
    }

    /// Creates a coordinator around any [`PageFetcher`]
    ///
    /// Fails with [`CrawlError::Config`] if `config` does not validate.
    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self, CrawlError> {
        validate(&config)?;
        let base_url = Url::parse(&config.crawler.base_url)?;

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            base_url,
            output_path: output_path.into(),
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Runs discovery followed by the item crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The run finished; check `run.status` for an
    ///   incomplete run
    /// * `Err(CrawlError::Discovery)` - The first listing page could not be read
    pub async fn run(&self) -> Result<CrawlReport, CrawlError> {
        let start = Instant::now();
        let crawler = &self.config.crawler;

        tracing::info!("Discovering listing pages from {}", self.base_url);
        let discovery = collect_item_urls(
            self.fetcher.as_ref(),
            &self.base_url,
            crawler.listing_timeout(),
        )
        .await?;

        tracing::info!(
            "Collected {} item URLs from {} listing pages ({} failed)",
            discovery.item_urls.len(),
            discovery.total_pages,
            discovery.failed_pages.len()
        );

        let orchestrator = Orchestrator::new(
            Arc::clone(&self.fetcher),
            OrchestratorSettings::from(crawler),
            &self.output_path,
        );
        let run = orchestrator.run(discovery.item_urls.clone()).await;

        Ok(CrawlReport {
            discovery,
            run,
            output_path: self.output_path.clone(),
            elapsed: start.elapsed(),
        })
    }
}

/// Runs a complete crawl, writing to a fresh timestamped file
///
/// # Example
///
/// ```no_run
/// use catalog_crawler::config::Config;
/// use catalog_crawler::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(Config::default()).await?;
/// println!("{} records in {}", report.run.succeeded, report.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    let output_path = prepare_output_path(&config.output)?;
    tracing::info!("Output file: {}", output_path.display());

    let coordinator = Coordinator::new(config, output_path)?;
    coordinator.run().await
}
