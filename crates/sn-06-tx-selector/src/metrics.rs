//! Metrics for transaction selection.

use std::sync::atomic::{AtomicU64, Ordering};

/// Selector counters.
#[derive(Debug, Default)]
pub struct SelectorMetrics {
    /// Candidates tried.
    pub considered: AtomicU64,

    /// Candidates included.
    pub selected: AtomicU64,

    /// Candidates the runner refused.
    pub rejected: AtomicU64,

    /// Selections stopped by the deadline.
    pub scheduler_timeouts: AtomicU64,
}

impl SelectorMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished run.
    pub fn record_run(&self, considered: u64, selected: u64, rejected: u64, timed_out: bool) {
        self.considered.fetch_add(considered, Ordering::Relaxed);
        self.selected.fetch_add(selected, Ordering::Relaxed);
        self.rejected.fetch_add(rejected, Ordering::Relaxed);
        if timed_out {
            self.scheduler_timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get selected total
    pub fn get_selected(&self) -> u64 {
        self.selected.load(Ordering::Relaxed)
    }

    /// Get timeout count
    pub fn get_timeouts(&self) -> u64 {
        self.scheduler_timeouts.load(Ordering::Relaxed)
    }
}
