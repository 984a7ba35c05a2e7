//! # Shared Types Crate
//!
//! The data model every block-production subsystem speaks: chain primitives,
//! transactions, DAG events and their payloads, blocks and receipts, the
//! validator set, network rules and the upgrade registry.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types live here and nowhere
//!   else.
//! - **Canonical Encoding**: consensus-relevant types implement RLP
//!   `Encodable`/`Decodable`; hashes are always taken over those encodings.
//! - **Immutable Events**: a signed [`EventPayload`] cannot be mutated; the
//!   emitter composes a [`MutableEventPayload`] and seals it.
//! - **Snapshots over Locks**: frequently read values (rules, validators,
//!   upgrade heights) are published through [`Snapshot`].
//!
//! ## Module Map
//!
//! ```text
//! primitives ─┬─ transaction ─┬─ payload ── event
//!             │               └─ block
//!             ├─ validators ──── state
//!             └─ rules ───────── upgrades
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod payload;
pub mod primitives;
pub mod rules;
pub mod snapshot;
pub mod state;
pub mod transaction;
pub mod upgrades;
pub mod validators;

pub use block::{
    Block, BlockBuilder, Log, Receipt, TxPosition, MAX_BLOCK_SIZE, MAX_PROPOSAL_TX_SIZE,
    RECEIPT_STATUS_FAILED, RECEIPT_STATUS_SUCCESSFUL,
};
pub use errors::{RulesValidationError, TypesError};
pub use event::{
    EventHeader, EventPayload, EventSignature, GasPowerLeft, MutableEventPayload, EVENT_VERSION_2,
    EVENT_VERSION_3, LONG_TERM_GAS, SHORT_TERM_GAS,
};
pub use hashing::{keccak256, keccak256_concat, sha256, sha256_concat};
pub use payload::{
    BlockVotes, EpochVote, MisbehaviourProof, Payload, Proposal, ProposalSyncState, RandaoReveal,
    Turn,
};
pub use primitives::{
    Address, BlockNumber, Epoch, EventId, Frame, Gas, Hash, Lamport, Seq, UnixNanos, ValidatorId,
    H160, NANOS_PER_MILLI, NANOS_PER_SEC, U256,
};
pub use rules::{
    BlocksRules, DagRules, EconomyRules, EmitterRules, EpochsRules, GasPowerRules, GasRules, Rules,
    Upgrades, GWEI,
};
pub use snapshot::Snapshot;
pub use state::{
    validators_from_profiles, BlockCtx, BlockState, EpochState, ValidatorBlockState,
    ValidatorEpochState, ValidatorEventInfo, ValidatorProfile, ValidatorProfiles,
};
pub use transaction::{AccessListItem, Authorization, Transaction, TxSignature, TxType};
pub use upgrades::{ChainConfig, UpgradeHeight};
pub use validators::{Validators, ValidatorsBuilder, Weight};
