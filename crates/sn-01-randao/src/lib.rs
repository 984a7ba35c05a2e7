//! # SN-01: RANDAO Reveal
//!
//! Verifiable proposer randomness for single-proposer blocks.
//!
//! ## Purpose
//!
//! The elected proposer signs `sha256("Sonic-Randao" ‖ previous_randao)` with
//! its validator key and embeds the 64-byte signature in its proposal. Every
//! node verifies the reveal against the proposer's registered key and derives
//! the block's PREVRANDAO as `sha256(reveal)`. A missing or invalid reveal
//! falls back to a value derived from the confirmed events, which all honest
//! nodes agree on.
//!
//! ```text
//!   previous_randao ──► sha256(domain ‖ ·) ──► sign ──► reveal ──► sha256 ──► next
//!                                                         │
//!                             verify(pubkey) ─── fail ────┴──► legacy(events)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod error;

pub use domain::entropy::normalized_shannon_entropy;
pub use domain::reveal::{
    legacy_prev_randao, new_reveal, prev_randao, reveal_message, verify_reveal, RANDAO_DOMAIN,
};
pub use error::{RandaoError, Result};

/// Subsystem identifier
pub const SUBSYSTEM_ID: u8 = 1;
