//! Error types for the transaction pool.

use shared_types::{Address, Hash, U256};
use thiserror::Error;

/// Pool admission errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Already in the pool.
    #[error("duplicate transaction {0:?}")]
    Duplicate(Hash),

    /// Sender recovery failed.
    #[error("invalid sender: {0}")]
    InvalidSender(String),

    /// Fee cap below the pool minimum.
    #[error("underpriced: {price} < {minimum}")]
    Underpriced {
        /// Offered fee cap.
        price: U256,
        /// Required minimum.
        minimum: U256,
    },

    /// Nonce already used on chain.
    #[error("nonce too low: {nonce} < {expected}")]
    NonceTooLow {
        /// Transaction nonce.
        nonce: u64,
        /// Account nonce.
        expected: u64,
    },

    /// Gas below the intrinsic cost, or unaffordable.
    #[error("intrinsic gas too low")]
    IntrinsicGas,

    /// Replacement does not bump the price enough.
    #[error("replacement underpriced: need {min_bump_percent}% over {old_price}")]
    ReplacementUnderpriced {
        /// Price of the queued transaction.
        old_price: U256,
        /// Required bump.
        min_bump_percent: u64,
    },

    /// Sender has too many queued transactions.
    #[error("account {address:?} reached its limit of {limit}")]
    AccountLimit {
        /// Sender.
        address: Address,
        /// Per-account limit.
        limit: usize,
    },

    /// Pool is at capacity and the transaction does not outbid anything.
    #[error("pool full ({capacity})")]
    PoolFull {
        /// Capacity.
        capacity: usize,
    },
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
