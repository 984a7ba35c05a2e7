//! # Double-Sign Protection
//!
//! Two processes signing for one validator sooner or later produce a fork,
//! and forks get the validator slashed. The heuristics here are windowed in
//! wall-clock time:
//!
//! - a fresh event of this validator that this process did not create means a
//!   parallel instance is running: halt for good;
//! - any other sign of a foreign self-event (or a lost prev-emitted file)
//!   pauses emission for the protection window.

use shared_types::UnixNanos;
use std::fmt;
use std::time::Duration;

/// What the node knows about its own synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Current time.
    pub now: UnixNanos,
    /// Connected peers.
    pub peers: usize,
    /// The node caught up with its peers.
    pub p2p_synced: bool,
    /// Creation time of the latest foreign self-event.
    pub external_self_event_created: Option<UnixNanos>,
    /// When the latest foreign self-event (or a lost prev-emitted file) was
    /// noticed.
    pub external_self_event_detected: Option<UnixNanos>,
}

impl SyncStatus {
    /// Time elapsed since `t`, zero for future times.
    pub fn since(&self, t: UnixNanos) -> UnixNanos {
        self.now.saturating_sub(t)
    }
}

/// Why emission is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotSynced {
    /// Remaining pause, zero when it ends with an external condition.
    pub wait: UnixNanos,
    /// Human-readable reason.
    pub reason: &'static str,
}

impl fmt::Display for NotSynced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason)
    }
}

/// True if the latest foreign self-event is recent enough to prove a
/// parallel instance.
pub fn detect_parallel_instance(status: &SyncStatus, threshold: Duration) -> bool {
    if threshold.is_zero() {
        return false;
    }
    status
        .external_self_event_created
        .is_some_and(|created| status.since(created) < threshold.as_nanos() as UnixNanos)
}

/// Whether emission may proceed. A zero `threshold` disables every check.
pub fn synced_to_emit(status: &SyncStatus, threshold: Duration) -> Result<(), NotSynced> {
    if threshold.is_zero() {
        return Ok(());
    }
    if status.peers == 0 {
        return Err(NotSynced {
            wait: 0,
            reason: "no peers",
        });
    }
    if !status.p2p_synced {
        return Err(NotSynced {
            wait: 0,
            reason: "not synced with peers",
        });
    }
    let threshold = threshold.as_nanos() as UnixNanos;
    if let Some(detected) = status.external_self_event_detected {
        let since = status.since(detected);
        if since < threshold {
            return Err(NotSynced {
                wait: threshold - since,
                reason: "recently observed an event of this validator created elsewhere",
            });
        }
    }
    Ok(())
}
