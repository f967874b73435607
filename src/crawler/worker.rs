//! Item workers and the work queue they share
//!
//! The work queue is filled and then closed; a worker stops when it finds the
//! queue closed and drained, or when the run's cancellation token fires. Both
//! are checked only between items, so a fetch in flight always runs to its
//! own timeout.

use crate::crawler::extractor::extract_record;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::record::FetchOutcome;
use crate::state::WorkerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of one bounded wait on the work queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop {
    /// An item to process
    Item(Url),

    /// Nothing arrived within the wait; the queue is still open
    Empty,

    /// The queue is closed and fully drained
    Closed,

    /// The run was cancelled
    Cancelled,
}

/// Producer side of the work queue; dropping it closes the queue
#[derive(Debug)]
pub struct WorkSender {
    tx: mpsc::Sender<Url>,
}

impl WorkSender {
    /// Enqueues one item, waiting for capacity if the queue is full
    ///
    /// Returns false if every consumer is gone.
    pub async fn push(&self, url: Url) -> bool {
        self.tx.send(url).await.is_ok()
    }

    /// Closes the queue; consumers see [`Pop::Closed`] once it drains
    pub fn close(self) {}
}

/// Consumer side of the work queue, shared by every worker
#[derive(Debug, Clone)]
pub struct WorkQueue {
    rx: Arc<Mutex<mpsc::Receiver<Url>>>,
}

impl WorkQueue {
    /// Creates a bounded multi-consumer work queue
    pub fn bounded(capacity: usize) -> (WorkSender, WorkQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            WorkSender { tx },
            WorkQueue {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Takes the next item, waiting at most `wait`
    ///
    /// The receiver lock is taken inside the wait, so a worker queued behind
    /// another worker's pop is bounded by the same deadline.
    pub async fn pop(&self, wait: Duration, cancel: &CancellationToken) -> Pop {
        if cancel.is_cancelled() {
            return Pop::Cancelled;
        }

        let recv = async { self.rx.lock().await.recv().await };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Pop::Cancelled,
            received = tokio::time::timeout(wait, recv) => match received {
                Ok(Some(url)) => Pop::Item(url),
                Ok(None) => Pop::Closed,
                Err(_) => Pop::Empty,
            },
        }
    }
}

/// Everything one worker needs; cloned per worker
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: WorkQueue,
    pub results: mpsc::Sender<FetchOutcome>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub fetch_timeout: Duration,
    pub queue_wait: Duration,
    pub cancel: CancellationToken,
}

/// Fetches and extracts one item page, collapsing every failure into
/// [`FetchOutcome::Failure`]
pub async fn process_item(fetcher: &dyn PageFetcher, url: &Url, timeout: Duration) -> FetchOutcome {
    let body = match fetcher.fetch(url, timeout).await {
        Ok(body) => body,
        Err(e) => {
            return FetchOutcome::Failure {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    match extract_record(&body, url.as_str()) {
        Ok(extraction) => FetchOutcome::Success(Box::new(extraction)),
        Err(e) => FetchOutcome::Failure {
            url: url.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Runs one worker until the queue is exhausted or the run is cancelled
///
/// Returns the number of items this worker processed.
pub async fn run_worker(id: usize, ctx: WorkerContext) -> usize {
    let mut state = WorkerState::Idle;
    let mut processed = 0;

    loop {
        let url = match ctx.queue.pop(ctx.queue_wait, &ctx.cancel).await {
            Pop::Item(url) => url,
            Pop::Empty => continue,
            Pop::Closed | Pop::Cancelled => break,
        };

        transition(id, &mut state, WorkerState::Fetching);
        tracing::debug!("Worker {} fetching {}", id, url);
        let outcome = process_item(ctx.fetcher.as_ref(), &url, ctx.fetch_timeout).await;

        if let FetchOutcome::Failure { url, reason } = &outcome {
            tracing::debug!("Worker {} failed {}: {}", id, url, reason);
        }

        transition(id, &mut state, WorkerState::Reporting);
        processed += 1;
        if ctx.results.send(outcome).await.is_err() {
            // Aggregator is gone; nobody is counting any more
            tracing::debug!("Worker {} found result queue closed", id);
            transition(id, &mut state, WorkerState::Idle);
            break;
        }

        transition(id, &mut state, WorkerState::Idle);
    }

    transition(id, &mut state, WorkerState::Stopped);
    tracing::debug!("Worker {} stopped after {} items", id, processed);
    processed
}

fn transition(id: usize, state: &mut WorkerState, next: WorkerState) {
    debug_assert!(
        state.can_transition_to(next),
        "worker {}: {} -> {}",
        id,
        state,
        next
    );
    tracing::trace!("Worker {}: {} -> {}", id, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CrawlError;
    use async_trait::async_trait;

    struct StaticFetcher {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<String, CrawlError> {
            match self.body {
                Some(body) => Ok(body.to_string()),
                None => Err(CrawlError::Timeout {
                    url: url.to_string(),
                }),
            }
        }
    }

    fn url(n: usize) -> Url {
        Url::parse(&format!("https://example.com/item-{}", n)).unwrap()
    }

    #[tokio::test]
    async fn test_pop_drains_then_closes() {
        let (tx, queue) = WorkQueue::bounded(4);
        assert!(tx.push(url(1)).await);
        assert!(tx.push(url(2)).await);
        tx.close();

        let cancel = CancellationToken::new();
        let wait = Duration::from_millis(50);
        assert_eq!(queue.pop(wait, &cancel).await, Pop::Item(url(1)));
        assert_eq!(queue.pop(wait, &cancel).await, Pop::Item(url(2)));
        assert_eq!(queue.pop(wait, &cancel).await, Pop::Closed);
        assert_eq!(queue.pop(wait, &cancel).await, Pop::Closed);
    }

    #[tokio::test]
    async fn test_pop_on_open_empty_queue_times_out() {
        let (_tx, queue) = WorkQueue::bounded(1);
        let cancel = CancellationToken::new();
        assert_eq!(
            queue.pop(Duration::from_millis(20), &cancel).await,
            Pop::Empty
        );
    }

    #[tokio::test]
    async fn test_pop_after_cancel() {
        let (tx, queue) = WorkQueue::bounded(1);
        tx.push(url(1)).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            queue.pop(Duration::from_millis(20), &cancel).await,
            Pop::Cancelled
        );
    }

    #[tokio::test]
    async fn test_process_item_failure_is_reported() {
        let fetcher = StaticFetcher { body: None };
        let outcome = process_item(&fetcher, &url(1), Duration::from_secs(1)).await;
        assert!(matches!(outcome, FetchOutcome::Failure { .. }));
    }

    #[tokio::test]
    async fn test_process_item_empty_body_is_failure() {
        let fetcher = StaticFetcher { body: Some("") };
        let outcome = process_item(&fetcher, &url(1), Duration::from_secs(1)).await;
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_worker_reports_every_item_then_stops() {
        let (tx, queue) = WorkQueue::bounded(3);
        for n in 0..3 {
            tx.push(url(n)).await;
        }
        tx.close();

        let (results_tx, mut results_rx) = mpsc::channel(8);
        let ctx = WorkerContext {
            queue,
            results: results_tx,
            fetcher: Arc::new(StaticFetcher {
                body: Some("<html><body><h1>Item</h1></body></html>"),
            }),
            fetch_timeout: Duration::from_secs(1),
            queue_wait: Duration::from_millis(50),
            cancel: CancellationToken::new(),
        };

        let processed = run_worker(0, ctx).await;
        assert_eq!(processed, 3);

        let mut received = 0;
        while let Some(outcome) = results_rx.recv().await {
            assert!(outcome.is_success());
            received += 1;
        }
        assert_eq!(received, 3);
    }
}
