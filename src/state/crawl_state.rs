use crate::crawler::{FetchOutcome, Record};

/// Running counters and accumulated records for one crawl
///
/// Owned by the aggregation loop alone; workers only ever see the queues.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    dispatched: usize,
    succeeded: usize,
    failed: usize,
    degraded: usize,
    records: Vec<Record>,
}

impl CrawlState {
    /// Creates the state for a run that put `dispatched` items on the work queue
    pub fn new(dispatched: usize) -> Self {
        Self {
            dispatched,
            ..Self::default()
        }
    }

    /// Folds one outcome into the counters
    ///
    /// Returns true when the outcome was a success, so the caller can decide
    /// whether a checkpoint is due.
    pub fn apply(&mut self, outcome: FetchOutcome) -> bool {
        match outcome {
            FetchOutcome::Success(extraction) => {
                if !extraction.warnings.is_empty() {
                    self.degraded += 1;
                }
                self.records.push(extraction.record);
                self.succeeded += 1;
                true
            }
            FetchOutcome::Failure { .. } => {
                self.failed += 1;
                false
            }
        }
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Successful records that fell back to at least one field default
    pub fn degraded(&self) -> usize {
        self.degraded
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Outcomes still owed by the workers
    pub fn pending(&self) -> usize {
        self.dispatched.saturating_sub(self.processed())
    }

    /// True once every dispatched item has been accounted for
    pub fn is_complete(&self) -> bool {
        self.processed() >= self.dispatched
    }

    /// Records in completion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
