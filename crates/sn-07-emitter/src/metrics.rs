//! Emitter metrics.
//!
//! Besides counters this holds the first-seen time of recent transactions,
//! used both for confirmation latency and for the origination turn.

use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{Hash, UnixNanos};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Emitter counters and the transaction time cache.
#[derive(Debug)]
pub struct EmitterMetrics {
    /// Events emitted.
    pub events_emitted: AtomicU64,

    /// Ticks that ended without an event.
    pub ticks_skipped: AtomicU64,

    /// Proposals attached to emitted events.
    pub proposals: AtomicU64,

    /// Transactions originated in version-2 events.
    pub txs_originated: AtomicU64,

    /// Ticks refused by the sync checks.
    pub not_synced: AtomicU64,

    /// Confirmed transactions with a known first-seen time.
    pub txs_confirmed: AtomicU64,

    /// Sum of their first-seen to confirmation latencies.
    pub tx_latency_total: AtomicU64,

    tx_times: Mutex<LruCache<Hash, UnixNanos>>,
}

impl EmitterMetrics {
    /// Metrics remembering up to `tx_time_capacity` transactions.
    pub fn new(tx_time_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(tx_time_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            events_emitted: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            proposals: AtomicU64::new(0),
            txs_originated: AtomicU64::new(0),
            not_synced: AtomicU64::new(0),
            txs_confirmed: AtomicU64::new(0),
            tx_latency_total: AtomicU64::new(0),
            tx_times: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record an emitted event.
    pub fn record_emitted(&self, txs: usize, proposal: bool) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
        self.txs_originated.fetch_add(txs as u64, Ordering::Relaxed);
        if proposal {
            self.proposals.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a tick without emission.
    pub fn record_skip(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a tick refused by the sync checks.
    pub fn record_not_synced(&self) {
        self.not_synced.fetch_add(1, Ordering::Relaxed);
    }

    /// Remember `hash` as seen at `now` unless it is already known. Returns
    /// the first-seen time.
    pub fn record_tx_seen(&self, hash: Hash, now: UnixNanos) -> UnixNanos {
        let mut times = self.tx_times.lock();
        *times.get_or_insert(hash, || now)
    }

    /// First-seen time of `hash`.
    pub fn tx_first_seen(&self, hash: &Hash) -> Option<UnixNanos> {
        self.tx_times.lock().peek(hash).copied()
    }

    /// Record confirmation of `hash` at `now` and forget it.
    pub fn record_tx_confirmed(&self, hash: &Hash, now: UnixNanos) {
        if let Some(seen) = self.tx_times.lock().pop(hash) {
            self.txs_confirmed.fetch_add(1, Ordering::Relaxed);
            self.tx_latency_total
                .fetch_add(now.saturating_sub(seen), Ordering::Relaxed);
        }
    }

    /// Get emitted event count
    pub fn get_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    /// Get proposal count
    pub fn get_proposals(&self) -> u64 {
        self.proposals.load(Ordering::Relaxed)
    }

    /// Get originated transaction count
    pub fn get_txs_originated(&self) -> u64 {
        self.txs_originated.load(Ordering::Relaxed)
    }

    /// Mean confirmation latency in nanoseconds, zero before the first
    /// confirmation.
    pub fn mean_tx_latency(&self) -> u64 {
        let n = self.txs_confirmed.load(Ordering::Relaxed);
        if n == 0 {
            return 0;
        }
        self.tx_latency_total.load(Ordering::Relaxed) / n
    }
}

impl Default for EmitterMetrics {
    fn default() -> Self {
        Self::new(20_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_kept() {
        let m = EmitterMetrics::new(4);
        let h = Hash::repeat_byte(1);
        assert_eq!(m.record_tx_seen(h, 10), 10);
        assert_eq!(m.record_tx_seen(h, 20), 10);
        assert_eq!(m.tx_first_seen(&h), Some(10));
    }

    #[test]
    fn test_latency_from_first_seen() {
        let m = EmitterMetrics::new(4);
        m.record_tx_seen(Hash::repeat_byte(1), 100);
        m.record_tx_seen(Hash::repeat_byte(2), 200);
        m.record_tx_confirmed(&Hash::repeat_byte(1), 400);
        m.record_tx_confirmed(&Hash::repeat_byte(2), 400);
        m.record_tx_confirmed(&Hash::repeat_byte(3), 400);
        assert_eq!(m.txs_confirmed.load(Ordering::Relaxed), 2);
        assert_eq!(m.mean_tx_latency(), 250);
        assert_eq!(m.tx_first_seen(&Hash::repeat_byte(1)), None);
    }

    #[test]
    fn test_capacity_bounded() {
        let m = EmitterMetrics::new(2);
        for i in 0..5u8 {
            m.record_tx_seen(Hash::repeat_byte(i), u64::from(i));
        }
        assert_eq!(m.tx_first_seen(&Hash::repeat_byte(0)), None);
        assert_eq!(m.tx_first_seen(&Hash::repeat_byte(4)), Some(4));
    }
}
