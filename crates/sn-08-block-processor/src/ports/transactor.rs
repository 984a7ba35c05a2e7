//! Internal transaction port.

use shared_types::{BlockCtx, BlockState, EpochState, Transaction};

/// What an internal transaction source may look at.
#[derive(Debug, Clone, Copy)]
pub struct InternalCtx<'a> {
    /// Block being assembled.
    pub block: &'a BlockCtx,
    /// True if this block seals the epoch.
    pub sealing: bool,
    /// Block state before the block.
    pub block_state: &'a BlockState,
    /// Epoch state before the block.
    pub epoch_state: &'a EpochState,
}

/// Source of system transactions run before and after user transactions.
pub trait InternalTransactor: Send + Sync {
    /// Transactions run before user transactions.
    fn pre_internal(&self, ctx: &InternalCtx<'_>) -> Vec<Transaction>;

    /// Transactions run after user transactions.
    fn post_internal(&self, ctx: &InternalCtx<'_>) -> Vec<Transaction>;
}
