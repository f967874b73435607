//! Crawl orchestration - the worker pool and the aggregation loop
//!
//! Item URLs go onto a shared work queue that is closed once filled. `W`
//! workers drain it in parallel and push exactly one outcome per item onto a
//! single result queue. One aggregation loop owns the [`CrawlState`], folds
//! outcomes into it, checkpoints every `K` successes, and stops once every
//! dispatched item is accounted for or the result queue stays silent for
//! longer than the collection timeout.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::record::{FetchOutcome, Record};
use crate::crawler::worker::{run_worker, WorkQueue, WorkerContext};
use crate::output::CheckpointWriter;
use crate::state::CrawlState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Outcomes between two progress log lines
const PROGRESS_EVERY: usize = 10;

/// Why a run stopped before every item was accounted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// No outcome arrived within the collection timeout
    CollectTimeout,

    /// Every worker exited while outcomes were still owed
    WorkersGone,
}

/// How the aggregation loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// `succeeded + failed == dispatched`
    Complete,

    /// Aggregation stopped early; `pending` outcomes were never received
    Incomplete {
        pending: usize,
        reason: IncompleteReason,
    },
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Tunables for one orchestrated run
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub workers: usize,
    pub fetch_timeout: Duration,
    pub queue_wait: Duration,
    pub collect_timeout: Duration,
    pub shutdown_grace: Duration,
    pub checkpoint_interval: usize,
    pub result_buffer: usize,
}

impl From<&CrawlerConfig> for OrchestratorSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            workers: config.workers,
            fetch_timeout: config.fetch_timeout(),
            queue_wait: config.queue_wait(),
            collect_timeout: config.collect_timeout(),
            shutdown_grace: config.shutdown_grace(),
            checkpoint_interval: config.checkpoint_interval,
            result_buffer: config.result_buffer,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

/// Final counts and records of one orchestrated run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful records that used at least one field default
    pub degraded: usize,
    pub status: RunStatus,
    /// Checkpoint writes that failed (the run carried on regardless)
    pub checkpoint_failures: usize,
    /// Workers still running when the shutdown grace period ran out
    pub abandoned_workers: usize,
    /// Records in completion order
    pub records: Vec<Record>,
    pub elapsed: Duration,
}

/// Drives the worker pool over a fixed set of item URLs
pub struct Orchestrator {
    fetcher: Arc<dyn PageFetcher>,
    settings: OrchestratorSettings,
    checkpoint: CheckpointWriter,
}

impl Orchestrator {
    /// Creates an orchestrator writing checkpoints to `destination`
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        settings: OrchestratorSettings,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            settings,
            checkpoint: CheckpointWriter::new(destination),
        }
    }

    /// Fetches every URL in `urls` and returns the aggregated result
    ///
    /// Item failures are absorbed into the counters; the only irregular
    /// ending is [`RunStatus::Incomplete`], which still leaves a final
    /// checkpoint of whatever was collected.
    pub async fn run(&self, urls: Vec<Url>) -> RunSummary {
        let start = Instant::now();
        let dispatched = urls.len();
        let workers = self.settings.workers.max(1);
        let cancel = CancellationToken::new();

        let (work_tx, queue) = WorkQueue::bounded(dispatched);
        for url in urls {
            work_tx.push(url).await;
        }
        work_tx.close();

        let (results_tx, mut results_rx) = mpsc::channel(self.settings.result_buffer.max(1));

        tracing::info!(
            "Dispatching {} items to {} workers",
            dispatched,
            workers
        );

        let handles: Vec<JoinHandle<usize>> = (0..workers)
            .map(|id| {
                let ctx = WorkerContext {
                    queue: queue.clone(),
                    results: results_tx.clone(),
                    fetcher: Arc::clone(&self.fetcher),
                    fetch_timeout: self.settings.fetch_timeout,
                    queue_wait: self.settings.queue_wait,
                    cancel: cancel.clone(),
                };
                tokio::spawn(run_worker(id, ctx))
            })
            .collect();

        // Workers hold the only senders from here on
        drop(results_tx);
        drop(queue);

        let mut state = CrawlState::new(dispatched);
        let mut checkpoint_failures = 0;
        let status = self
            .aggregate(&mut state, &mut results_rx, &mut checkpoint_failures)
            .await;

        // Idle workers stop at their next dequeue; busy ones find the result
        // queue closed when they try to report.
        cancel.cancel();
        drop(results_rx);

        if !self.write_checkpoint(state.records()) {
            checkpoint_failures += 1;
        }

        let abandoned_workers = self.await_workers(handles).await;

        tracing::info!(
            "Run finished: {} succeeded, {} failed of {} dispatched in {:?}",
            state.succeeded(),
            state.failed(),
            dispatched,
            start.elapsed()
        );

        RunSummary {
            dispatched,
            succeeded: state.succeeded(),
            failed: state.failed(),
            degraded: state.degraded(),
            status,
            checkpoint_failures,
            abandoned_workers,
            records: state.into_records(),
            elapsed: start.elapsed(),
        }
    }

    async fn aggregate(
        &self,
        state: &mut CrawlState,
        results: &mut mpsc::Receiver<FetchOutcome>,
        checkpoint_failures: &mut usize,
    ) -> RunStatus {
        let interval = self.settings.checkpoint_interval.max(1);

        while !state.is_complete() {
            let outcome =
                match tokio::time::timeout(self.settings.collect_timeout, results.recv()).await {
                    Ok(Some(outcome)) => outcome,
                    Ok(None) => {
                        tracing::error!(
                            "All workers exited with {} outcomes outstanding",
                            state.pending()
                        );
                        return RunStatus::Incomplete {
                            pending: state.pending(),
                            reason: IncompleteReason::WorkersGone,
                        };
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Timed out after {:?} waiting for results, {} outstanding",
                            self.settings.collect_timeout,
                            state.pending()
                        );
                        return RunStatus::Incomplete {
                            pending: state.pending(),
                            reason: IncompleteReason::CollectTimeout,
                        };
                    }
                };

            if let FetchOutcome::Success(extraction) = &outcome {
                for warning in &extraction.warnings {
                    tracing::debug!("{}: defaulted {}", extraction.record.url, warning);
                }
            }

            let succeeded = state.apply(outcome);

            if state.processed() % PROGRESS_EVERY == 0 {
                tracing::info!(
                    "Processed: {}/{} (Success: {}, Failed: {})",
                    state.processed(),
                    state.dispatched(),
                    state.succeeded(),
                    state.failed()
                );
            }

            if succeeded && state.succeeded() % interval == 0 {
                if self.write_checkpoint(state.records()) {
                    tracing::info!("Checkpointed {} records", state.succeeded());
                } else {
                    *checkpoint_failures += 1;
                }
            }
        }

        RunStatus::Complete
    }

    /// Writes a checkpoint, logging instead of failing
    fn write_checkpoint(&self, records: &[Record]) -> bool {
        match self.checkpoint.write(records) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Checkpoint to {} failed: {}",
                    self.checkpoint.destination().display(),
                    e
                );
                false
            }
        }
    }

    /// Waits up to the grace period for every worker; returns how many were
    /// left running
    async fn await_workers(&self, handles: Vec<JoinHandle<usize>>) -> usize {
        let deadline = tokio::time::Instant::now() + self.settings.shutdown_grace;
        let mut abandoned = 0;

        for handle in handles {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("Worker task failed: {}", e),
                Err(_) => abandoned += 1,
            }
        }

        if abandoned > 0 {
            tracing::warn!(
                "Abandoning {} workers still running after {:?}",
                abandoned,
                self.settings.shutdown_grace
            );
        }

        abandoned
    }
}
