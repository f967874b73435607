//! Checkpoint persistence
//!
//! Every checkpoint rewrites the whole record sequence. The JSON is written
//! to a temporary file next to the destination and renamed over it, so a
//! reader never observes a half-written file.

use crate::crawler::Record;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while writing or reading a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to move checkpoint into place: {0}")]
    Persist(std::io::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Writes the accumulated records to one fixed destination
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    destination: PathBuf,
}

impl CheckpointWriter {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Replaces the destination with a pretty-printed JSON array of `records`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The destination now holds exactly `records`
    /// * `Err(CheckpointError)` - Nothing was changed at the destination
    pub fn write(&self, records: &[Record]) -> CheckpointResult<()> {
        let dir = match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        // The temp file carried by the error is deleted when it drops
        temp.persist(&self.destination)
            .map_err(|e| CheckpointError::Persist(e.error))?;

        tracing::debug!(
            "Wrote {} records to {}",
            records.len(),
            self.destination.display()
        );
        Ok(())
    }
}

/// Reads records back from a checkpoint file
pub fn load_checkpoint(path: &Path) -> CheckpointResult<Vec<Record>> {
    let file = File::open(path)?;
    let records = serde_json::from_reader(BufReader::new(file))?;
    Ok(records)
}
