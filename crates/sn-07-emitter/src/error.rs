//! Error types for the emitter.

use shared_crypto::CryptoError;
use shared_types::{EventId, ValidatorId};
use sn_01_randao::RandaoError;
use sn_03_event_check::CheckError;
use sn_05_proposer::TurnError;
use thiserror::Error;

/// Emitter errors.
#[derive(Debug, Error)]
pub enum EmitterError {
    /// Another process signs events for this validator.
    #[error(
        "recent event {event} of validator {validator} was not created by this node; \
         stop the other instance before restarting"
    )]
    ParallelInstance {
        /// The foreign event.
        event: EventId,
        /// This validator.
        validator: ValidatorId,
    },

    /// A previous run stopped on a permanent error.
    #[error("node locked by an earlier permanent error: {0}")]
    Locked(String),

    /// Reading or writing emitter files failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The prev-emitted file does not hold an event id.
    #[error("corrupt prev-emitted file: {0}")]
    CorruptPrevEmitted(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Sign(#[from] CryptoError),

    /// RANDAO reveal could not be produced.
    #[error("randao: {0}")]
    Randao(#[from] RandaoError),

    /// Proposer election failed.
    #[error("proposer election: {0}")]
    Turn(#[from] TurnError),

    /// The event was refused by the local checks.
    #[error("own event rejected: {0}")]
    Rejected(#[from] CheckError),

    /// The event could not be handed to the DAG.
    #[error("event not processed: {0}")]
    Process(String),

    /// The emitter has stopped.
    #[error("emitter terminated")]
    Terminated,
}

impl EmitterError {
    /// Errors that must halt the node until an operator intervenes.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            EmitterError::ParallelInstance { .. }
                | EmitterError::Locked(_)
                | EmitterError::Io(_)
                | EmitterError::CorruptPrevEmitted(_)
        )
    }
}

/// Result alias for the emitter.
pub type Result<T> = std::result::Result<T, EmitterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_classification() {
        let parallel = EmitterError::ParallelInstance {
            event: EventId::zero(),
            validator: 1,
        };
        assert!(parallel.is_permanent());
        assert!(!EmitterError::Terminated.is_permanent());
        assert!(!EmitterError::Process("queue full".into()).is_permanent());
    }
}
