//! Error types for the store.

use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store was closed, usually by an epoch switch.
    #[error("store closed")]
    Closed,

    /// Another process holds the data directory.
    #[error("data directory locked: {0}")]
    Locked(String),

    /// A log record failed its checksum outside the tail.
    #[error("corrupted record at offset {offset}")]
    Corrupted {
        /// Byte offset of the record.
        offset: u64,
    },

    /// A value failed to decode.
    #[error("decode error in table {table}: {reason}")]
    Decode {
        /// Table name.
        table: &'static str,
        /// Decoder message.
        reason: String,
    },
}

impl StoreError {
    /// Errors after which the node must not continue.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_) | StoreError::Corrupted { .. } | StoreError::Decode { .. }
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
