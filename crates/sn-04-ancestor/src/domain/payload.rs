//! Payload indexer: propagates a "payload lamport" through the DAG so the
//! emitter can prefer parents that carry transactions.
//!
//! `value(e) = max(value(parent)) + own(e)`; values live in a bounded LRU.

use super::Metric;
use lru::LruCache;
use shared_types::EventId;
use std::num::NonZeroUsize;

/// LRU-backed payload metric propagation.
pub struct PayloadIndexer {
    cache: LruCache<EventId, Metric>,
}

impl PayloadIndexer {
    /// Indexer remembering at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Record `id` with its own payload metric.
    pub fn process_event(&mut self, id: EventId, parents: &[EventId], own: Metric) {
        let value = self.get_metric_of(parents) + own;
        self.cache.put(id, value);
    }

    /// Best parent value; evicted parents count as zero.
    pub fn get_metric_of(&mut self, parents: &[EventId]) -> Metric {
        parents
            .iter()
            .filter_map(|p| self.cache.get(p).copied())
            .max()
            .unwrap_or(0)
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for PayloadIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadIndexer")
            .field("len", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Hash;

    fn id(n: u64) -> EventId {
        EventId(Hash::from_low_u64_be(n))
    }

    #[test]
    fn test_metric_accumulates_along_path() {
        let mut p = PayloadIndexer::new(16);
        p.process_event(id(1), &[], 5);
        p.process_event(id(2), &[id(1)], 0);
        p.process_event(id(3), &[id(2)], 2);
        p.process_event(id(4), &[], 1);
        assert_eq!(p.get_metric_of(&[id(3)]), 7);
        assert_eq!(p.get_metric_of(&[id(3), id(4)]), 7);
        assert_eq!(p.get_metric_of(&[id(4)]), 1);
    }

    #[test]
    fn test_evicted_parent_counts_as_zero() {
        let mut p = PayloadIndexer::new(1);
        p.process_event(id(1), &[], 5);
        p.process_event(id(2), &[], 1);
        assert_eq!(p.get_metric_of(&[id(1)]), 0);
    }
}
