//! # Checker Errors
//!
//! One variant per rejection kind, with a nested reason. Every rejection is
//! recoverable at the node level: the event is dropped and the peer may be
//! penalized. Only [`CheckError::Terminated`] signals shutdown.

use shared_types::{BlockNumber, Epoch, EventId, Frame, Gas, Lamport, Seq, ValidatorId};
use sn_05_proposer::TurnError;
use thiserror::Error;

/// Structural defects detectable from the event alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasicError {
    /// Seq, lamport or frame is zero
    #[error("zero seq, lamport or frame")]
    NotInited,
    /// Seq, lamport, frame or epoch beyond the sane range
    #[error("too large counter or gas value")]
    HugeValue,
    /// Creation or median time is zero
    #[error("zero creation or median time")]
    ZeroTime,
    /// Seq > 1 with no parents
    #[error("event has no parents")]
    NoParents,
    /// Seq 1 event with parents but lamport 1, or vice versa
    #[error("lamport inconsistent with parents")]
    WrongLamport,
    /// The same parent twice
    #[error("duplicate parent {0}")]
    DuplicateParents(EventId),
    /// Value with the sign bit set
    #[error("transaction value is negative")]
    NegativeValue,
    /// Gas price with the sign bit set
    #[error("transaction gas price is negative")]
    NegativeGasPrice,
    /// Intrinsic gas above the gas limit
    #[error("intrinsic gas too high")]
    IntrinsicGas,
    /// Fee cap below tip cap
    #[error("fee cap less than tip cap")]
    FeeCapBelowTip,
}

/// Violations of the current epoch's rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpochError {
    /// Event of another epoch
    #[error("wrong epoch {got}, current {expected}")]
    WrongEpoch {
        /// Event epoch
        got: Epoch,
        /// Current epoch
        expected: Epoch,
    },
    /// Creator outside the validator set
    #[error("validator {0} not in the epoch")]
    AuthFailure(ValidatorId),
    /// Too many parents
    #[error("too many parents {got} > {max}")]
    TooManyParents {
        /// Parent count
        got: usize,
        /// Allowed parents
        max: u32,
    },
    /// Extra data too large
    #[error("extra data too large {got} > {max}")]
    TooBigExtra {
        /// Extra length
        got: usize,
        /// Allowed length
        max: u32,
    },
    /// Event version does not match the upgrade set
    #[error("wrong event version {got}, expected {expected}")]
    WrongVersion {
        /// Event version
        got: u8,
        /// Expected version
        expected: u8,
    },
    /// Declared gas use differs from the computed one
    #[error("wrong gas power used {got}, expected {expected}")]
    WrongGasUsed {
        /// Declared
        got: Gas,
        /// Computed
        expected: Gas,
    },
    /// Gas use above the per-event ceiling
    #[error("gas power used {got} exceeds {max}")]
    TooBigGasUsed {
        /// Declared
        got: Gas,
        /// Ceiling
        max: Gas,
    },
    /// Transaction type not enabled by the upgrades
    #[error("transaction type {0} not allowed")]
    TxTypeNotAllowed(u8),
    /// Fee cap below the minimum gas price
    #[error("transaction gas price below the minimum")]
    UnderpricedTx,
}

/// Inconsistencies with the parents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParentsError {
    /// Parent not known locally
    #[error("parent {0} not found")]
    MissingParent(EventId),
    /// Self-parent not first, missing, or of the wrong seq
    #[error("wrong self-parent")]
    WrongSelfParent,
    /// Creation time not after the self-parent's
    #[error("creation time not after self-parent")]
    PastTime,
    /// Seq not self-parent seq + 1
    #[error("wrong seq {got}, expected {expected}")]
    WrongSeq {
        /// Event seq
        got: Seq,
        /// Expected seq
        expected: Seq,
    },
    /// Lamport not max parent lamport + 1
    #[error("wrong lamport {got}, expected {expected}")]
    WrongLamport {
        /// Event lamport
        got: Lamport,
        /// Expected lamport
        expected: Lamport,
    },
    /// Frame differs from the computed one
    #[error("wrong frame {got}, expected {expected}")]
    WrongFrame {
        /// Event frame
        got: Frame,
        /// Expected frame
        expected: Frame,
    },
}

/// Gas-power accounting mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GasPowerError {
    /// Declared gas power left differs from the computed one
    #[error("wrong gas power left in window {window}: {got} + {used} != {expected}")]
    WrongGasPowerLeft {
        /// Window index
        window: usize,
        /// Declared gas left
        got: Gas,
        /// Declared gas used
        used: Gas,
        /// Computed available gas
        expected: Gas,
    },
    /// Gas used above the available gas power
    #[error("not enough gas power")]
    NotEnoughGasPower,
}

/// Version-3 payload violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalError {
    /// Version-3 event carrying version-2 fields
    #[error("version 3 event with version 2 fields")]
    HasV2Fields,
    /// Version-3 event without a payload
    #[error("missing payload")]
    MissingPayload,
    /// Sync state unchanged but a proposal attached
    #[error("proposal without a turn")]
    UnexpectedProposal,
    /// Sync state advanced without a proposal
    #[error("turn without a proposal")]
    MissingProposal,
    /// Invalid turn claim
    #[error("invalid turn: {0}")]
    InvalidTurn(#[from] TurnError),
    /// Proposal number differs from the claimed block
    #[error("wrong proposed block {got}, expected {expected}")]
    WrongBlockNumber {
        /// Proposal number
        got: BlockNumber,
        /// Expected number
        expected: BlockNumber,
    },
    /// Parent hash differs from the known block
    #[error("wrong parent hash")]
    WrongParentHash,
    /// Proposal transactions too large
    #[error("proposal too large {size} > {max}")]
    TooLarge {
        /// Encoded size
        size: u64,
        /// Limit
        max: u64,
    },
}

/// Event check failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// Structural defect
    #[error("invalid basic: {0}")]
    InvalidBasic(#[from] BasicError),
    /// Epoch rule violation
    #[error("invalid epoch: {0}")]
    InvalidEpoch(#[from] EpochError),
    /// Parent inconsistency
    #[error("invalid parents: {0}")]
    InvalidParents(#[from] ParentsError),
    /// Gas-power mismatch
    #[error("invalid gas power: {0}")]
    InvalidGasPower(#[from] GasPowerError),
    /// Payload violation
    #[error("invalid proposal: {0}")]
    InvalidProposal(#[from] ProposalError),
    /// Signature does not verify against the creator key
    #[error("invalid signature")]
    InvalidSignature,
    /// Payload hash mismatch
    #[error("invalid payload hash")]
    InvalidPayloadHash,
    /// Creator key unknown or malformed, or a tx sender unrecoverable
    #[error("authentication failure: {0}")]
    AuthFailure(String),
    /// Event belongs to a past epoch
    #[error("event too late")]
    EventTooLate,
    /// The checker shut down
    #[error("checker terminated")]
    Terminated,
}

impl CheckError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidBasic(_) => "basic",
            Self::InvalidEpoch(_) => "epoch",
            Self::InvalidParents(_) => "parents",
            Self::InvalidGasPower(_) => "gas_power",
            Self::InvalidProposal(_) => "proposal",
            Self::InvalidSignature => "signature",
            Self::InvalidPayloadHash => "payload_hash",
            Self::AuthFailure(_) => "auth",
            Self::EventTooLate => "too_late",
            Self::Terminated => "terminated",
        }
    }

    /// True for every rejection; false only for shutdown.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Terminated)
    }
}

/// Result alias for checkers.
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_nesting() {
        let e: CheckError = ProposalError::InvalidTurn(TurnError::NoValidators).into();
        assert_eq!(e.kind(), "proposal");
        assert!(e.to_string().contains("invalid turn"));
        assert!(e.is_recoverable());
        assert!(!CheckError::Terminated.is_recoverable());
    }
}
