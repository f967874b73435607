//! Catalog-Crawler main entry point
//!
//! This is the command-line interface for the catalog harvester.

use anyhow::Context;
use catalog_crawler::config::{load_config_with_hash, validate, Config};
use catalog_crawler::crawler::crawl;
use catalog_crawler::output::{load_checkpoint, print_report, print_statistics, record_statistics};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Exit code for a run that stopped before every item was accounted for
const INCOMPLETE_EXIT_CODE: i32 = 2;

/// Catalog-Crawler: a concurrent product catalog harvester
///
/// Walks every listing page of the catalog, fetches each item page with a
/// bounded pool of parallel workers, and writes the extracted records to a
/// timestamped JSON file, checkpointing as it goes.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version)]
#[command(about = "A concurrent product catalog harvester", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Root URL of the catalog
    #[arg(long)]
    base_url: Option<String>,

    /// Number of parallel item workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-item fetch timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Successful records between checkpoints
    #[arg(long, value_name = "N")]
    checkpoint_interval: Option<usize>,

    /// Directory the output file is written into
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for an existing output file and exit
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    stats: Option<PathBuf>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.crawler.base_url = base_url.clone();
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.crawler.fetch_timeout_secs = timeout;
        }
        if let Some(interval) = self.checkpoint_interval {
            config.crawler.checkpoint_interval = interval;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.stats {
        return handle_stats(path);
    }

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawler=info,warn"),
            1 => EnvFilter::new("catalog_crawler=debug,info"),
            2 => EnvFilter::new("catalog_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;

    println!("=== Catalog-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", crawler.base_url);
    println!("  Workers: {}", crawler.workers);
    println!("  Item fetch timeout: {}s", crawler.fetch_timeout_secs);
    println!("  Listing fetch timeout: {}s", crawler.listing_timeout_secs);
    println!("  Queue wait: {}ms", crawler.queue_wait_ms);
    println!("  Collection timeout: {}s", crawler.collect_timeout_secs);
    println!("  Shutdown grace: {}s", crawler.shutdown_grace_secs);
    println!("  Checkpoint interval: {} records", crawler.checkpoint_interval);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  File prefix: {}", config.output.file_prefix);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarises an existing output file
fn handle_stats(path: &Path) -> anyhow::Result<()> {
    let records =
        load_checkpoint(path).with_context(|| format!("failed to read {}", path.display()))?;

    println!("File: {}\n", path.display());
    print_statistics(&record_statistics(&records));

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} with {} workers",
        config.crawler.base_url,
        config.crawler.workers
    );

    let report = crawl(config).await.context("crawl failed")?;
    print_report(&report);

    if report.run.status.is_complete() {
        tracing::info!("Crawl completed successfully");
    } else {
        tracing::warn!(
            "Crawl ended early; {} records saved to {}",
            report.run.succeeded,
            report.output_path.display()
        );
        std::process::exit(INCOMPLETE_EXIT_CODE);
    }

    Ok(())
}
