//! # Greedy Selector
//!
//! Fills a proposal from per-sender nonce queues. The head of every queue
//! sits in a max-heap keyed by effective tip; the best head is tried against
//! the runner and replaced by the sender's next transaction.
//!
//! ```text
//!   sender A: [n0, n1, n2]        heap of heads
//!   sender B: [n5]          ──►   (tip, -arrival, -hash)  ──► runner.run
//!   sender C: [n0, n1]                 ▲                          │
//!                                      └──── next of sender ◄─────┘
//! ```

use super::pool::PooledTx;
use crate::ports::{RunOutcome, TxRunner};
use shared_types::{Address, Gas, Hash, UnixNanos, U256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Bounds of one selection run.
#[derive(Debug, Clone, Copy)]
pub struct SelectionLimits {
    /// Gas available to user transactions.
    pub gas_limit: Gas,
    /// Byte budget of the selected transactions.
    pub max_size: u64,
    /// Base fee of the block being proposed.
    pub base_fee: U256,
    /// Stop scheduling at this instant.
    pub deadline: Instant,
}

/// Outcome of a selection run.
#[derive(Debug, Default)]
pub struct Selection {
    /// Selected transactions in execution order.
    pub txs: Vec<Arc<PooledTx>>,
    /// Gas used by them.
    pub gas_used: Gas,
    /// Their encoded size.
    pub size: u64,
    /// Candidates tried.
    pub considered: u64,
    /// Candidates the runner refused.
    pub rejected: u64,
    /// True if the deadline cut the run short.
    pub timed_out: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct Head {
    tip: U256,
    added_at: UnixNanos,
    hash: Hash,
    sender: Address,
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tip
            .cmp(&other.tip)
            .then_with(|| other.added_at.cmp(&self.added_at))
            .then_with(|| other.hash.cmp(&self.hash))
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Queues {
    base_fee: U256,
    by_sender: BTreeMap<Address, VecDeque<Arc<PooledTx>>>,
    heap: BinaryHeap<Head>,
}

impl Queues {
    fn new(pending: BTreeMap<Address, Vec<Arc<PooledTx>>>, base_fee: U256) -> Self {
        let mut q = Self {
            base_fee,
            by_sender: pending
                .into_iter()
                .map(|(s, txs)| (s, txs.into_iter().collect()))
                .collect(),
            heap: BinaryHeap::new(),
        };
        let senders: Vec<Address> = q.by_sender.keys().copied().collect();
        for s in senders {
            q.push_head(s);
        }
        q
    }

    /// Push the sender's front transaction, dropping the sender if the
    /// front cannot pay the base fee.
    fn push_head(&mut self, sender: Address) {
        let Some(front) = self.by_sender.get(&sender).and_then(|q| q.front()) else {
            self.by_sender.remove(&sender);
            return;
        };
        match front.tx.effective_gas_tip(self.base_fee) {
            Some(tip) => self.heap.push(Head {
                tip,
                added_at: front.added_at,
                hash: front.hash,
                sender,
            }),
            None => {
                self.by_sender.remove(&sender);
            }
        }
    }

    fn pop(&mut self) -> Option<Arc<PooledTx>> {
        let head = self.heap.pop()?;
        self.by_sender.get(&head.sender)?.front().cloned()
    }

    fn shift(&mut self, sender: Address) {
        if let Some(q) = self.by_sender.get_mut(&sender) {
            q.pop_front();
        }
        self.push_head(sender);
    }

    fn drop_sender(&mut self, sender: Address) {
        self.by_sender.remove(&sender);
    }
}

/// Select transactions for a proposal.
#[tracing::instrument(skip_all, fields(senders = pending.len(), gas_limit = limits.gas_limit))]
pub fn select<R: TxRunner + ?Sized>(
    pending: BTreeMap<Address, Vec<Arc<PooledTx>>>,
    runner: &mut R,
    limits: &SelectionLimits,
) -> Selection {
    let mut queues = Queues::new(pending, limits.base_fee);
    let mut out = Selection::default();

    while let Some(ptx) = queues.pop() {
        if Instant::now() >= limits.deadline {
            out.timed_out = true;
            break;
        }
        let sender = ptx.sender;
        let remaining = limits.gas_limit.saturating_sub(out.gas_used);
        if ptx.tx.gas > remaining {
            queues.drop_sender(sender);
            continue;
        }
        let size = ptx.tx.size();
        if out.size + size > limits.max_size {
            queues.drop_sender(sender);
            continue;
        }

        out.considered += 1;
        match runner.run(&ptx.tx, sender) {
            RunOutcome::Included { gas_used } => {
                out.gas_used += gas_used;
                out.size += size;
                out.txs.push(ptx);
                queues.shift(sender);
            }
            RunOutcome::NonceTooLow => queues.shift(sender),
            RunOutcome::NonceGap | RunOutcome::Rejected => {
                out.rejected += 1;
                queues.drop_sender(sender);
            }
        }
    }
    out
}

/// Interleave senders by effective tip without executing anything, keeping
/// each sender's nonce order.
pub fn price_ordered(
    pending: BTreeMap<Address, Vec<Arc<PooledTx>>>,
    base_fee: U256,
) -> Vec<Arc<PooledTx>> {
    let mut queues = Queues::new(pending, base_fee);
    let mut out = Vec::new();
    while let Some(ptx) = queues.pop() {
        let sender = ptx.sender;
        out.push(ptx);
        queues.shift(sender);
    }
    out
}
