//! Output module for persisting harvested records
//!
//! This module handles:
//! - Choosing the timestamped output path
//! - Atomic checkpoint writes of the accumulated records
//! - Statistics over records and end-of-run reports

mod checkpoint;
pub mod stats;

pub use checkpoint::{load_checkpoint, CheckpointError, CheckpointResult, CheckpointWriter};
pub use stats::{print_report, print_statistics, record_statistics, RecordStatistics};

use crate::config::OutputConfig;
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Timestamp format used in output file names, e.g. `19-10-2026@143005`
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y@%H%M%S";

/// Builds `<directory>/<prefix>_<timestamp>.json` for the given instant
pub fn timestamped_output_path(config: &OutputConfig, now: DateTime<Local>) -> PathBuf {
    PathBuf::from(&config.directory).join(format!(
        "{}_{}.json",
        config.file_prefix,
        now.format(TIMESTAMP_FORMAT)
    ))
}

/// Creates the output directory if needed and returns a fresh output path
pub fn prepare_output_path(config: &OutputConfig) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(&config.directory)?;
    Ok(timestamped_output_path(config, Local::now()))
}
