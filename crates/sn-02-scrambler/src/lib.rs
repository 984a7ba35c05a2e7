//! # SN-02: Deterministic Transaction Scrambler
//!
//! Orders the union of transactions carried by a block's confirmed events
//! when blocks are formed from events rather than from a single proposal.
//!
//! ## Purpose
//!
//! Every node must derive the same transaction order from the same set of
//! transactions and block number, while no single event creator can predict
//! or steer the position of its transactions. Senders are shuffled with a
//! seed that commits to the whole transaction set; each sender's own
//! transactions keep nonce order.
//!
//! ## Ordering Constraints
//!
//! ```text
//!   sender A:  a0 ─► a1 ─► a2          nonce order per sender
//!                     ▲
//!   sender B:  b0 ────┘                b0 authorizes A at nonce 1
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;

pub use domain::entry::{ScramblerEntry, SenderTx};
pub use domain::rng::XorShiftStar;
pub use domain::scramble::scramble;

/// Subsystem identifier
pub const SUBSYSTEM_ID: u8 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 2);
    }
}
