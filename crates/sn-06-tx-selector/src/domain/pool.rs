//! # Transaction Pool
//!
//! Executable-looking transactions indexed by hash and by `(sender, nonce)`.
//! The pool does not execute anything; nonce gaps and balances are the
//! selector's business.

use crate::config::SelectorConfig;
use crate::error::{PoolError, Result};
use shared_types::{Address, Hash, Transaction, UnixNanos, U256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A queued transaction with its recovered sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledTx {
    /// The signed transaction.
    pub tx: Transaction,
    /// Cached hash.
    pub hash: Hash,
    /// Recovered sender.
    pub sender: Address,
    /// Local arrival time.
    pub added_at: UnixNanos,
}

impl PooledTx {
    /// Wrap a transaction whose sender is already known.
    pub fn new(tx: Transaction, sender: Address, added_at: UnixNanos) -> Self {
        Self {
            hash: tx.hash(),
            tx,
            sender,
            added_at,
        }
    }
}

/// Transactions by hash and sender.
#[derive(Debug)]
pub struct TxPool {
    config: SelectorConfig,
    min_gas_price: U256,
    by_hash: HashMap<Hash, Arc<PooledTx>>,
    by_sender: HashMap<Address, BTreeMap<u64, Hash>>,
}

impl TxPool {
    /// Empty pool.
    pub fn new(config: SelectorConfig, min_gas_price: U256) -> Self {
        Self {
            config,
            min_gas_price,
            by_hash: HashMap::new(),
            by_sender: HashMap::new(),
        }
    }

    /// Update the price floor, usually on new rules.
    pub fn set_min_gas_price(&mut self, price: U256) {
        self.min_gas_price = price;
    }

    /// Number of queued transactions.
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// True if `hash` is queued.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Queued transaction by hash.
    pub fn get(&self, hash: &Hash) -> Option<Arc<PooledTx>> {
        self.by_hash.get(hash).cloned()
    }

    /// Admit `ptx`. `account_nonce` is the sender's current state nonce.
    pub fn add(&mut self, ptx: PooledTx, account_nonce: u64) -> Result<()> {
        if self.by_hash.contains_key(&ptx.hash) {
            return Err(PoolError::Duplicate(ptx.hash));
        }
        if ptx.tx.gas_fee_cap < self.min_gas_price {
            return Err(PoolError::Underpriced {
                price: ptx.tx.gas_fee_cap,
                minimum: self.min_gas_price,
            });
        }
        if ptx.tx.nonce < account_nonce {
            return Err(PoolError::NonceTooLow {
                nonce: ptx.tx.nonce,
                expected: account_nonce,
            });
        }
        match ptx.tx.intrinsic_gas() {
            Some(g) if g <= ptx.tx.gas => {}
            _ => return Err(PoolError::IntrinsicGas),
        }

        let existing = self
            .by_sender
            .get(&ptx.sender)
            .and_then(|m| m.get(&ptx.tx.nonce))
            .copied();
        if let Some(old_hash) = existing {
            let old_price = self.by_hash[&old_hash].tx.gas_fee_cap;
            let bump = U256::from(100 + self.config.replace_bump_percent);
            if ptx.tx.gas_fee_cap * U256::from(100u64) < old_price * bump {
                return Err(PoolError::ReplacementUnderpriced {
                    old_price,
                    min_bump_percent: self.config.replace_bump_percent,
                });
            }
            self.remove(&old_hash);
        } else {
            let queued = self.by_sender.get(&ptx.sender).map_or(0, |m| m.len());
            if queued >= self.config.max_per_account {
                return Err(PoolError::AccountLimit {
                    address: ptx.sender,
                    limit: self.config.max_per_account,
                });
            }
            if self.by_hash.len() >= self.config.capacity && !self.evict_for(&ptx) {
                return Err(PoolError::PoolFull {
                    capacity: self.config.capacity,
                });
            }
        }

        self.by_sender
            .entry(ptx.sender)
            .or_default()
            .insert(ptx.tx.nonce, ptx.hash);
        self.by_hash.insert(ptx.hash, Arc::new(ptx));
        Ok(())
    }

    /// Evict the cheapest tail transaction if `ptx` outbids it.
    fn evict_for(&mut self, ptx: &PooledTx) -> bool {
        let victim = self
            .by_sender
            .values()
            .filter_map(|m| m.values().next_back())
            .filter_map(|h| self.by_hash.get(h))
            .min_by(|a, b| {
                a.tx.gas_fee_cap
                    .cmp(&b.tx.gas_fee_cap)
                    .then(b.added_at.cmp(&a.added_at))
            })
            .map(|v| (v.hash, v.tx.gas_fee_cap));
        match victim {
            Some((hash, price)) if price < ptx.tx.gas_fee_cap => {
                self.remove(&hash);
                true
            }
            _ => false,
        }
    }

    /// Remove by hash.
    pub fn remove(&mut self, hash: &Hash) -> Option<Arc<PooledTx>> {
        let ptx = self.by_hash.remove(hash)?;
        if let Some(m) = self.by_sender.get_mut(&ptx.sender) {
            m.remove(&ptx.tx.nonce);
            if m.is_empty() {
                self.by_sender.remove(&ptx.sender);
            }
        }
        Some(ptx)
    }

    /// Drop transactions whose nonce fell below the sender's state nonce.
    pub fn prune<F: Fn(&Address) -> u64>(&mut self, account_nonce: F) -> usize {
        let stale: Vec<Hash> = self
            .by_sender
            .iter()
            .flat_map(|(sender, m)| {
                let nonce = account_nonce(sender);
                m.range(..nonce).map(|(_, h)| *h).collect::<Vec<_>>()
            })
            .collect();
        for h in &stale {
            self.remove(h);
        }
        stale.len()
    }

    /// Queued transactions per sender in nonce order, senders sorted.
    pub fn pending(&self) -> BTreeMap<Address, Vec<Arc<PooledTx>>> {
        self.by_sender
            .iter()
            .map(|(sender, m)| {
                let txs = m.values().filter_map(|h| self.by_hash.get(h).cloned()).collect();
                (*sender, txs)
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ptx(sender: u8, nonce: u64, price: u64) -> PooledTx {
        let tx = Transaction {
            nonce,
            gas: 21_000,
            gas_fee_cap: U256::from(price),
            gas_tip_cap: U256::from(price),
            to: Some(Address::from_low_u64_be(0xee00 + u64::from(sender))),
            ..Default::default()
        };
        PooledTx::new(tx, Address::repeat_byte(sender), nonce)
    }

    fn pool() -> TxPool {
        TxPool::new(
            SelectorConfig {
                capacity: 4,
                max_per_account: 3,
                ..Default::default()
            },
            U256::from(1u64),
        )
    }

    #[test]
    fn test_add_and_pending_order() {
        let mut p = pool();
        p.add(ptx(1, 2, 5), 0).unwrap();
        p.add(ptx(1, 0, 5), 0).unwrap();
        let pending = p.pending();
        let nonces: Vec<u64> = pending[&Address::repeat_byte(1)].iter().map(|t| t.tx.nonce).collect();
        assert_eq!(nonces, vec![0, 2]);
    }

    #[test]
    fn test_rejects() {
        let mut p = pool();
        assert!(matches!(p.add(ptx(1, 0, 0), 0), Err(PoolError::Underpriced { .. })));
        assert!(matches!(p.add(ptx(1, 0, 5), 1), Err(PoolError::NonceTooLow { .. })));
        p.add(ptx(1, 0, 5), 0).unwrap();
        assert_eq!(p.add(ptx(1, 0, 5), 0), Err(PoolError::Duplicate(ptx(1, 0, 5).hash)));
        let mut low = ptx(1, 1, 5);
        low.tx.gas = 100;
        assert_eq!(p.add(PooledTx::new(low.tx, low.sender, 0), 0), Err(PoolError::IntrinsicGas));
    }

    #[test]
    fn test_replacement_needs_bump() {
        let mut p = pool();
        p.add(ptx(1, 0, 100), 0).unwrap();
        assert!(matches!(
            p.add(ptx(1, 0, 105), 0),
            Err(PoolError::ReplacementUnderpriced { .. })
        ));
        p.add(ptx(1, 0, 110), 0).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p.pending()[&Address::repeat_byte(1)][0].tx.gas_fee_cap, U256::from(110u64));
    }

    #[test]
    fn test_account_limit_and_eviction() {
        let mut p = pool();
        for n in 0..3 {
            p.add(ptx(1, n, 10), 0).unwrap();
        }
        assert!(matches!(p.add(ptx(1, 3, 10), 0), Err(PoolError::AccountLimit { .. })));
        p.add(ptx(2, 0, 10), 0).unwrap();
        assert!(matches!(p.add(ptx(3, 0, 5), 0), Err(PoolError::PoolFull { .. })));
        p.add(ptx(3, 0, 50), 0).unwrap();
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn test_same_nonce_from_two_senders() {
        let mut p = pool();
        p.add(ptx(1, 0, 10), 0).unwrap();
        p.add(ptx(2, 0, 10), 0).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.pending().len(), 2);
    }

    #[test]
    fn test_prune_stale_nonces() {
        let mut p = pool();
        p.add(ptx(1, 0, 10), 0).unwrap();
        p.add(ptx(1, 1, 10), 0).unwrap();
        p.add(ptx(2, 0, 10), 0).unwrap();
        let dropped = p.prune(|a| if *a == Address::repeat_byte(1) { 1 } else { 0 });
        assert_eq!(dropped, 1);
        assert_eq!(p.len(), 2);
    }
}
