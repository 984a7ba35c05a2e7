//! Clock implementations.

use crate::ports::Clock;
use shared_types::UnixNanos;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixNanos {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as UnixNanos)
            .unwrap_or(0)
    }
}

/// Clock moved by hand, for simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Clock reading `now`.
    pub fn new(now: UnixNanos) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: UnixNanos) -> UnixNanos {
        self.now.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Jump to `now`.
    pub fn set(&self, now: UnixNanos) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixNanos {
        self.now.load(Ordering::SeqCst)
    }
}
