//! Block assembly metrics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the consensus thread and the block worker.
#[derive(Debug, Default)]
pub struct BlockMetrics {
    /// Blocks written.
    pub blocks: AtomicU64,
    /// Consensus blocks that did not produce a block.
    pub skipped: AtomicU64,
    /// Transactions included.
    pub txs: AtomicU64,
    /// Transactions dropped by the EVM (bad nonce, balance, gas).
    pub txs_skipped: AtomicU64,
    /// Gas used by written blocks.
    pub gas_used: AtomicU64,
    /// Internal transactions that did not succeed.
    pub internal_reverts: AtomicU64,
    /// Events dropped by the block gas ceiling.
    pub spilled_events: AtomicU64,
    /// Epochs sealed.
    pub epochs_sealed: AtomicU64,
}

impl BlockMetrics {
    /// Record a written block.
    pub fn record_block(&self, txs: usize, skipped_txs: usize, gas_used: u64) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
        self.txs.fetch_add(txs as u64, Ordering::Relaxed);
        self.txs_skipped.fetch_add(skipped_txs as u64, Ordering::Relaxed);
        self.gas_used.fetch_add(gas_used, Ordering::Relaxed);
    }

    /// Record a skipped consensus block.
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed internal transaction.
    pub fn record_internal_revert(&self) {
        self.internal_reverts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record events spilled past the gas ceiling.
    pub fn record_spilled(&self, count: usize) {
        self.spilled_events.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record an epoch seal.
    pub fn record_seal(&self) {
        self.epochs_sealed.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks written so far.
    pub fn get_blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Consensus blocks skipped so far.
    pub fn get_skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Transactions included so far.
    pub fn get_txs(&self) -> u64 {
        self.txs.load(Ordering::Relaxed)
    }

    /// Failed internal transactions so far.
    pub fn get_internal_reverts(&self) -> u64 {
        self.internal_reverts.load(Ordering::Relaxed)
    }
}
