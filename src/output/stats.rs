//! Statistics over harvested records and crawl reports
//!
//! Used for the end-of-run summary and for inspecting an existing checkpoint
//! file with `--stats`.

use crate::crawler::{CrawlReport, IncompleteReason, Record, RunStatus};
use std::collections::BTreeMap;

/// Aggregate view of a set of records
#[derive(Debug, Clone, PartialEq)]
pub struct RecordStatistics {
    /// Total number of records
    pub total: usize,

    /// Records marked in stock
    pub in_stock: usize,

    /// Mean price over all records (0.0 when there are none)
    pub mean_price: f64,

    /// Records with a rating of 1..=5
    pub rated: usize,

    /// Mean rating over rated records only
    pub mean_rating: f64,

    /// Records per category, sorted by name
    pub by_category: BTreeMap<String, usize>,
}

/// Computes statistics over `records`
pub fn record_statistics(records: &[Record]) -> RecordStatistics {
    let total = records.len();
    let in_stock = records.iter().filter(|r| r.in_stock).count();

    let mean_price = if total > 0 {
        records.iter().map(|r| r.price).sum::<f64>() / total as f64
    } else {
        0.0
    };

    let ratings: Vec<u8> = records
        .iter()
        .map(|r| r.rating)
        .filter(|rating| *rating > 0)
        .collect();
    let mean_rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
    };

    let mut by_category = BTreeMap::new();
    for record in records {
        *by_category.entry(record.category.clone()).or_insert(0) += 1;
    }

    RecordStatistics {
        total,
        in_stock,
        mean_price,
        rated: ratings.len(),
        mean_rating,
        by_category,
    }
}

/// Prints record statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Record Statistics ===\n");

    println!("Overview:");
    println!("  Records: {}", stats.total);
    println!("  In stock: {}", stats.in_stock);
    println!("  Mean price: {:.2}", stats.mean_price);
    println!(
        "  Mean rating: {:.2} ({} rated)",
        stats.mean_rating, stats.rated
    );
    println!();

    if !stats.by_category.is_empty() {
        println!("Records by Category:");
        let mut counts: Vec<_> = stats.by_category.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (category, count) in counts {
            println!("  {}: {}", category, count);
        }
        println!();
    }
}

/// Prints the end-of-run summary
pub fn print_report(report: &CrawlReport) {
    let run = &report.run;

    println!("=== Crawl Complete ===\n");

    println!("Discovery:");
    println!("  Listing pages: {}", report.discovery.total_pages);
    println!("  Item URLs: {}", report.discovery.item_urls.len());
    if !report.discovery.failed_pages.is_empty() {
        println!("  Failed listing pages ({}):", report.discovery.failed_pages.len());
        for failure in &report.discovery.failed_pages {
            println!("    - page {}: {}", failure.page, failure.reason);
        }
    }
    println!();

    println!("Items:");
    println!("  Dispatched: {}", run.dispatched);
    println!("  Crawled: {}", run.succeeded);
    println!("  Failed: {}", run.failed);
    println!("  With defaulted fields: {}", run.degraded);
    println!();

    match run.status {
        RunStatus::Complete => println!("Status: complete"),
        RunStatus::Incomplete { pending, reason } => {
            let why = match reason {
                IncompleteReason::CollectTimeout => "timed out waiting for results",
                IncompleteReason::WorkersGone => "workers exited early",
            };
            println!("Status: INCOMPLETE ({}, {} items outstanding)", why, pending);
        }
    }

    if run.abandoned_workers > 0 {
        println!("Abandoned workers: {}", run.abandoned_workers);
    }
    if run.checkpoint_failures > 0 {
        println!("Failed checkpoint writes: {}", run.checkpoint_failures);
    }

    println!("Saved to: {}", report.output_path.display());
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
}
