//! Worker lifecycle states
//!
//! A worker cycles `Idle → Fetching → Reporting → Idle` and leaves the cycle
//! for `Stopped` only from `Idle`, i.e. between two items.

use std::fmt;

/// Represents the current state of one item worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Waiting on the work queue
    Idle,

    /// Fetching and extracting one item page
    Fetching,

    /// Handing the outcome to the result queue
    Reporting,

    /// Queue closed or run cancelled; the worker has exited
    Stopped,
}

impl WorkerState {
    /// Returns true if the worker will not pick up any more work
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Fetching)
                | (Self::Idle, Self::Stopped)
                | (Self::Fetching, Self::Reporting)
                | (Self::Reporting, Self::Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Reporting => "reporting",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
