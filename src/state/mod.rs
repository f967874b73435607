//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: dispatched/succeeded/failed counters and the accumulated
//!   records, owned by the single aggregation loop
//! - `WorkerState`: the lifecycle of one item worker

mod crawl_state;
mod worker_state;

// Re-export main types
pub use crawl_state::CrawlState;
pub use worker_state::WorkerState;
