//! Error types for the DAG index.

use shared_types::{EventId, ValidatorId};
use thiserror::Error;

/// DAG index errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AncestorError {
    /// Event creator is not in the indexed validator set
    #[error("Unknown creator {0}")]
    UnknownCreator(ValidatorId),

    /// A parent was not indexed before its child
    #[error("Unknown parent {0}")]
    UnknownParent(EventId),

    /// Self-parent has a different creator or a non-preceding seq
    #[error("Malformed self-parent {0}")]
    BadSelfParent(EventId),
}

/// Result alias for the DAG index.
pub type Result<T> = std::result::Result<T, AncestorError>;
