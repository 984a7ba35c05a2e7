//! # SN-05: Single-Proposer Protocol
//!
//! ## Purpose
//!
//! Turns block formation into a turn-based protocol carried entirely inside
//! version-3 event payloads. Every event publishes the proposal sync state
//! it has observed; the join of its parents' states tells the creator whose
//! turn it is, and the elected validator attaches a block proposal.
//!
//! ## Protocol Flow
//!
//! ```text
//!  parents' sync states ──join──► incoming (turn t, frame g, block b)
//!                                    │
//!                    frame f > g ?   │   attempt = (f - g - 1) / 8
//!                                    ▼
//!               proposer(validators, b + 1, attempt) == creator ?
//!                      │yes                          │no
//!                      ▼                             ▼
//!        payload = (t + 1, f, b + 1) + proposal   payload = incoming
//! ```
//!
//! ## Guarantees
//!
//! - The election is a pure function of the validator set, block number and
//!   attempt, so all honest validators agree on the proposer at each frame.
//! - A silent proposer only delays the chain by one turn timeout.
//! - Extraction is independent of the order candidates are visited in.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod error;

pub use domain::election::get_proposer;
pub use domain::extraction::{select_proposal, ProposalCandidate};
pub use domain::turn::{
    advance, attempt_at, incoming_state, is_allowed_to_propose, proposer_at, validate_turn,
    TURN_TIMEOUT_IN_FRAMES,
};
pub use error::{Result, TurnError};

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 5;
