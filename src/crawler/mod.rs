//! Crawler module for catalog discovery and item harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` boundary
//! - Listing page scanning and sequential URL collection
//! - Item page field extraction
//! - The parallel worker pool and result aggregation

mod coordinator;
mod extractor;
mod fetcher;
mod listing;
mod orchestrator;
mod record;
mod worker;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use extractor::{clean_price, extract_record, rating_from_markup};
pub use fetcher::{build_http_client, HttpFetcher, PageFetcher};
pub use listing::{
    collect_item_urls, parse_total_pages, scan_listing, Discovery, ListingFailure, ListingPage,
};
pub use orchestrator::{
    IncompleteReason, Orchestrator, OrchestratorSettings, RunStatus, RunSummary,
};
pub use record::{
    Extraction, FetchOutcome, Field, FieldWarning, Record, CURRENCY, DEFAULT_CATEGORY,
    DEFAULT_TITLE,
};
pub use worker::{process_item, run_worker, Pop, WorkQueue, WorkSender, WorkerContext};

use crate::config::Config;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Pick a timestamped output file
/// 2. Build the HTTP client
/// 3. Collect item URLs from every listing page
/// 4. Fetch and extract item pages in parallel
/// 5. Checkpoint records periodically and once at the end
pub async fn crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    run_crawl(config).await
}
