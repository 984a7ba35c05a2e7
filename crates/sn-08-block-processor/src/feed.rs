//! # Chain Head Feed
//!
//! Subscribers see new blocks strictly in height order with no gaps.
//! Publications that arrive ahead of the watermark wait in a min-heap until
//! the missing heights are published.
//!
//! ```text
//! publish(7)  heap {7}        watermark 5
//! publish(6)  heap {6,7}  ──► send 6, send 7   watermark 7
//! ```

use parking_lot::Mutex;
use shared_types::{Block, BlockNumber, Hash};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// A new chain head.
#[derive(Debug, Clone)]
pub struct ChainHeadNotify {
    /// The block.
    pub block: Arc<Block>,
}

impl ChainHeadNotify {
    /// Wrap `block`.
    pub fn new(block: Block) -> Self {
        Self {
            block: Arc::new(block),
        }
    }

    /// Height of the block.
    pub fn number(&self) -> BlockNumber {
        self.block.number
    }

    /// Hash of the block.
    pub fn hash(&self) -> Hash {
        self.block.hash
    }
}

struct Queued(ChainHeadNotify);

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.0.number() == other.0.number()
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.number().cmp(&other.0.number())
    }
}

struct Pending {
    heap: BinaryHeap<Reverse<Queued>>,
    next: BlockNumber,
}

/// Ordered broadcast of chain heads.
pub struct ChainHeadFeed {
    sender: broadcast::Sender<ChainHeadNotify>,
    pending: Mutex<Pending>,
}

impl ChainHeadFeed {
    /// Feed whose first released height is `next`.
    pub fn new(capacity: usize, next: BlockNumber) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            pending: Mutex::new(Pending {
                heap: BinaryHeap::new(),
                next,
            }),
        }
    }

    /// New subscriber; it receives heads published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChainHeadNotify> {
        self.sender.subscribe()
    }

    /// Queue `head` and release every head that became contiguous. Returns
    /// the number released.
    pub fn publish(&self, head: ChainHeadNotify) -> usize {
        let mut pending = self.pending.lock();
        if head.number() < pending.next {
            trace!(number = head.number(), "[sn-08] Stale chain head dropped");
            return 0;
        }
        pending.heap.push(Reverse(Queued(head)));

        let mut released = 0;
        while let Some(top) = pending.heap.peek().map(|Reverse(q)| q.0.number()) {
            if top > pending.next {
                break;
            }
            let Some(Reverse(Queued(head))) = pending.heap.pop() else {
                break;
            };
            if top < pending.next {
                // Duplicate of a released height.
                continue;
            }
            // No subscribers is fine.
            let _ = self.sender.send(head);
            pending.next += 1;
            released += 1;
        }
        released
    }

    /// Highest released height, or `None` before the first release.
    pub fn watermark(&self) -> Option<BlockNumber> {
        self.pending.lock().next.checked_sub(1)
    }

    /// Heads waiting for a gap to close.
    pub fn queued(&self) -> usize {
        self.pending.lock().heap.len()
    }
}
