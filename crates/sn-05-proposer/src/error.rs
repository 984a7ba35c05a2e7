//! Error types for the single-proposer protocol.

use shared_types::{BlockNumber, Frame, Turn, ValidatorId};
use thiserror::Error;

/// Reasons a claimed turn is not a valid successor of the incoming state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    /// Election over an empty validator set
    #[error("No validators to elect a proposer from")]
    NoValidators,

    /// No frame has elapsed since the last turn
    #[error("Frame {frame} does not advance past last proposal frame {last}")]
    FrameNotAdvanced {
        /// Frame of the claiming event
        frame: Frame,
        /// Frame of the last seen turn
        last: Frame,
    },

    /// Claimed turn is not exactly one above the incoming turn
    #[error("Turn {claimed} does not follow turn {incoming}")]
    WrongTurn {
        /// Turn in the payload
        claimed: Turn,
        /// Turn of the incoming state
        incoming: Turn,
    },

    /// Claimed turn frame differs from the event frame
    #[error("Turn frame {claimed} does not match event frame {frame}")]
    WrongTurnFrame {
        /// Frame in the payload
        claimed: Frame,
        /// Frame of the event
        frame: Frame,
    },

    /// Claimed block is not exactly one above the incoming block
    #[error("Proposed block {claimed} does not follow block {incoming}")]
    WrongBlock {
        /// Block in the payload
        claimed: BlockNumber,
        /// Block of the incoming state
        incoming: BlockNumber,
    },

    /// The creator is not the elected proposer
    #[error("Validator {creator} is not the proposer, expected {expected}")]
    NotProposer {
        /// Creator of the event
        creator: ValidatorId,
        /// Elected proposer
        expected: ValidatorId,
    },
}

/// Result alias for proposer operations.
pub type Result<T> = std::result::Result<T, TurnError>;
