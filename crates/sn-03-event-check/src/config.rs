//! Configuration for event checking.

use serde::Deserialize;

/// Heavy-check pool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeavyCheckConfig {
    /// Worker threads; 0 means one less than the CPU count, at least one.
    pub workers: usize,
    /// Bounded queue capacity.
    pub queue_size: usize,
    /// Sender cache capacity.
    pub sender_cache_size: usize,
}

impl Default for HeavyCheckConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_size: 1024,
            sender_cache_size: shared_crypto::tx_signer::DEFAULT_SENDER_CACHE_SIZE,
        }
    }
}

impl HeavyCheckConfig {
    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            num_cpus::get().saturating_sub(1).max(1)
        }
    }
}
