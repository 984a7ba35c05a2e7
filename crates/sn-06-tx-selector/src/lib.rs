//! # SN-06: Transaction Selector
//!
//! ## Purpose
//!
//! Holds transactions waiting for inclusion and picks the ones a proposal
//! carries: highest effective tip first, nonce order per sender, under a
//! gas budget, a size budget and a wall-clock deadline.
//!
//! ## Flow
//!
//! ```text
//!   add(tx) ──► sender recovery ──► TxPool (by hash, by sender/nonce)
//!                                        │ pending()
//!                                        ▼
//!                     select(pending, runner, limits) ──► Selection
//!                                        ▲
//!   on_block(included, nonces) ── prune ─┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::SelectorConfig;
pub use domain::pool::{PooledTx, TxPool};
pub use domain::selector::{price_ordered, select, Selection, SelectionLimits};
pub use error::{PoolError, Result};
pub use metrics::SelectorMetrics;
pub use ports::{RunOutcome, TxRunner};
pub use service::TxSelector;

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 6);
    }
}
