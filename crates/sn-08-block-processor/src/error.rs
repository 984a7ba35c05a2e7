//! Error types for block assembly.

use sn_09_store::StoreError;
use thiserror::Error;

/// Block assembly errors.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Persisting the block or the states failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The parent block is missing from the store.
    #[error("parent block {0} not found")]
    MissingParent(u64),

    /// No validator survives an epoch seal.
    #[error("epoch {epoch} sealed without validators")]
    EmptyValidatorSet {
        /// The epoch that would have started.
        epoch: u32,
    },

    /// The block worker failed to start or failed a block.
    #[error("block worker failed: {0}")]
    Worker(String),

    /// The block worker has stopped.
    #[error("block worker terminated")]
    Terminated,
}

impl BlockError {
    /// Errors after which the node must stop producing blocks.
    pub fn is_permanent(&self) -> bool {
        match self {
            BlockError::Store(e) => e.is_permanent(),
            BlockError::MissingParent(_)
            | BlockError::EmptyValidatorSet { .. }
            | BlockError::Worker(_) => true,
            BlockError::Terminated => false,
        }
    }
}

/// Result alias for block assembly.
pub type Result<T> = std::result::Result<T, BlockError>;
