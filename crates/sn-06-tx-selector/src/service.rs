//! # Transaction Selector Service
//!
//! Thread-safe pool front end shared by the emitter (selection) and the
//! block processor (pruning after each block).

use crate::config::SelectorConfig;
use crate::domain::pool::{PooledTx, TxPool};
use crate::domain::selector::{price_ordered, select, Selection, SelectionLimits};
use crate::error::{PoolError, Result};
use crate::metrics::SelectorMetrics;
use crate::ports::TxRunner;
use parking_lot::Mutex;
use shared_crypto::SenderCache;
use shared_types::{Address, Hash, Transaction, UnixNanos, U256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Pool plus selection entry points.
pub struct TxSelector {
    config: SelectorConfig,
    pool: Mutex<TxPool>,
    senders: Arc<SenderCache>,
    metrics: Arc<SelectorMetrics>,
}

impl TxSelector {
    /// Create the service.
    pub fn new(
        config: SelectorConfig,
        min_gas_price: U256,
        senders: Arc<SenderCache>,
        metrics: Arc<SelectorMetrics>,
    ) -> Self {
        Self {
            pool: Mutex::new(TxPool::new(config.clone(), min_gas_price)),
            config,
            senders,
            metrics,
        }
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Arc<SelectorMetrics> {
        &self.metrics
    }

    /// Admit a signed transaction.
    pub fn add(&self, tx: Transaction, account_nonce: u64, now: UnixNanos) -> Result<Hash> {
        let sender = self
            .senders
            .sender(&tx)
            .map_err(|e| PoolError::InvalidSender(e.to_string()))?;
        let ptx = PooledTx::new(tx, sender, now);
        let hash = ptx.hash;
        self.pool.lock().add(ptx, account_nonce)?;
        debug!(tx = ?hash, sender = ?sender, "[sn-06] 📥 Transaction queued");
        Ok(hash)
    }

    /// Number of queued transactions.
    pub fn len(&self) -> usize {
        self.pool.lock().len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pool.lock().is_empty()
    }

    /// Update the price floor.
    pub fn set_min_gas_price(&self, price: U256) {
        self.pool.lock().set_min_gas_price(price);
    }

    /// Snapshot of queued transactions per sender.
    pub fn pending(&self) -> BTreeMap<Address, Vec<Arc<PooledTx>>> {
        self.pool.lock().pending()
    }

    /// Queued transactions ordered by tip, nonce order kept per sender.
    pub fn ordered(&self, base_fee: U256) -> Vec<Arc<PooledTx>> {
        price_ordered(self.pending(), base_fee)
    }

    /// Deadline for a proposal of a block due at `block_due`, measured from
    /// `now`.
    pub fn deadline(&self, now: Instant, until_block_due: Duration) -> Instant {
        let budget = until_block_due
            .saturating_sub(self.config.deadline_slack)
            .min(self.config.max_selection_time);
        now + budget
    }

    /// Fill a proposal.
    pub fn select_for_proposal<R: TxRunner + ?Sized>(
        &self,
        runner: &mut R,
        limits: &SelectionLimits,
    ) -> Selection {
        let selection = select(self.pending(), runner, limits);
        self.metrics.record_run(
            selection.considered,
            selection.txs.len() as u64,
            selection.rejected,
            selection.timed_out,
        );
        if selection.timed_out {
            info!(
                selected = selection.txs.len(),
                "[sn-06] ⏱️ Selection deadline reached, proposing prefix"
            );
        }
        selection
    }

    /// Forget included transactions and everything below the new nonces.
    pub fn on_block<F: Fn(&Address) -> u64>(&self, included: &[Hash], account_nonce: F) {
        let mut pool = self.pool.lock();
        for h in included {
            pool.remove(h);
        }
        let pruned = pool.prune(account_nonce);
        if pruned > 0 {
            debug!(pruned, "[sn-06] 🧹 Stale transactions dropped");
        }
    }
}
