//! Error types for the node runtime.

use crate::config::ConfigError;
use shared_crypto::CryptoError;
use sn_06_tx_selector::PoolError;
use sn_07_emitter::EmitterError;
use sn_08_block_processor::BlockError;
use sn_09_store::StoreError;
use thiserror::Error;

/// Node errors.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Invalid configuration.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// The logging subscriber could not be installed.
    #[error("logging: {0}")]
    Logging(String),

    /// Store failure.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// Block assembly failure.
    #[error("block processor: {0}")]
    Block(#[from] BlockError),

    /// Emitter failure.
    #[error("emitter: {0}")]
    Emitter(#[from] EmitterError),

    /// Key handling failure.
    #[error("keys: {0}")]
    Crypto(#[from] CryptoError),

    /// A submitted transaction was refused.
    #[error("transaction rejected: {0}")]
    Pool(#[from] PoolError),

    /// A background task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl NodeError {
    /// Errors that leave the node locked until an operator intervenes.
    pub fn is_permanent(&self) -> bool {
        match self {
            NodeError::Store(e) => e.is_permanent(),
            NodeError::Block(e) => e.is_permanent(),
            NodeError::Emitter(e) => e.is_permanent(),
            NodeError::Config(_) | NodeError::Logging(_) | NodeError::Task(_) => true,
            NodeError::Crypto(_) | NodeError::Pool(_) => false,
        }
    }
}

/// Result alias for the node runtime.
pub type Result<T> = std::result::Result<T, NodeError>;
