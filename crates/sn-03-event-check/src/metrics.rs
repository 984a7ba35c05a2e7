//! Metrics for event checking.

use crate::error::CheckError;
use std::sync::atomic::{AtomicU64, Ordering};

const KINDS: [&str; 10] = [
    "basic",
    "epoch",
    "parents",
    "gas_power",
    "proposal",
    "signature",
    "payload_hash",
    "auth",
    "too_late",
    "terminated",
];

/// Check counters.
#[derive(Debug, Default)]
pub struct CheckMetrics {
    /// Events that passed every check
    pub events_accepted: AtomicU64,

    /// Rejections by kind, indexed like `KINDS`
    rejections: [AtomicU64; KINDS.len()],

    /// Tasks waiting in the heavy-check queue
    pub heavy_queue_depth: AtomicU64,
}

impl CheckMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted event
    pub fn record_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejection
    pub fn record_rejection(&self, err: &CheckError) {
        if let Some(i) = KINDS.iter().position(|k| *k == err.kind()) {
            self.rejections[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Set the heavy queue depth
    pub fn record_queue_depth(&self, depth: usize) {
        self.heavy_queue_depth.store(depth as u64, Ordering::Relaxed);
    }

    /// Get accepted events
    pub fn get_accepted(&self) -> u64 {
        self.events_accepted.load(Ordering::Relaxed)
    }

    /// Get rejections of `kind` (see [`CheckError::kind`])
    pub fn get_rejections(&self, kind: &str) -> u64 {
        KINDS
            .iter()
            .position(|k| *k == kind)
            .map(|i| self.rejections[i].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Get total rejections
    pub fn get_total_rejections(&self) -> u64 {
        self.rejections.iter().map(|r| r.load(Ordering::Relaxed)).sum()
    }
}
