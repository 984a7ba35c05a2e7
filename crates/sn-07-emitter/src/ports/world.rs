//! The emitter's view of the node.

use crate::error::Result;
use shared_types::{
    BlockNumber, BlockVotes, EpochState, EpochVote, EventId, EventPayload, Hash,
    MisbehaviourProof, UnixNanos, ValidatorId, U256,
};
use sn_06_tx_selector::TxRunner;
use std::sync::Arc;

/// Head of the local chain, fully written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlock {
    /// Height.
    pub number: BlockNumber,
    /// Hash.
    pub hash: Hash,
    /// Block time.
    pub time: UnixNanos,
    /// PREVRANDAO the next reveal signs over.
    pub prev_randao: Hash,
    /// Base fee.
    pub base_fee: U256,
}

/// Version-2 vote payload waiting to be carried.
#[derive(Debug, Clone, Default)]
pub struct PendingVotes {
    /// Block votes.
    pub block_votes: Option<BlockVotes>,
    /// At most one epoch vote.
    pub epoch_vote: Option<EpochVote>,
    /// Evidence against misbehaving validators.
    pub misbehaviour_proofs: Vec<MisbehaviourProof>,
}

impl PendingVotes {
    /// True if nothing waits.
    pub fn is_empty(&self) -> bool {
        self.block_votes.is_none()
            && self.epoch_vote.is_none()
            && self.misbehaviour_proofs.is_empty()
    }
}

/// Node services the emitter depends on.
pub trait World: Send + Sync {
    /// Current epoch state.
    fn epoch_state(&self) -> Arc<EpochState>;

    /// Latest block whose hash is known, `None` while the first block after
    /// a commit is still being written.
    fn latest_block(&self) -> Option<LatestBlock>;

    /// A connected event.
    fn event(&self, id: &EventId) -> Option<Arc<EventPayload>>;

    /// Highest-seq connected event of `creator` in the current epoch.
    fn last_event(&self, creator: ValidatorId) -> Option<Arc<EventPayload>>;

    /// Check `event` and connect it to the DAG.
    fn process(&self, event: EventPayload) -> Result<Arc<EventPayload>>;

    /// Send a connected own event to peers.
    fn broadcast(&self, event: &Arc<EventPayload>);

    /// Connected peers.
    fn peer_count(&self) -> usize;

    /// True once the node caught up with its peers.
    fn is_synced(&self) -> bool;

    /// Scratch execution on top of `head` for proposal filling. Dropping it
    /// discards every change.
    fn tx_runner(&self, head: &LatestBlock) -> Box<dyn TxRunner + Send>;

    /// Votes and proofs to carry in the next version-2 event.
    fn pending_votes(&self) -> PendingVotes {
        PendingVotes::default()
    }
}
