//! # SN-08: Block Processor
//!
//! ## Purpose
//!
//! Turns finalized consensus blocks into chain blocks. For every Atropos the
//! DAG engine opens a [`BlockAssembly`], streams the confirmed events into it
//! and closes it; the processor decides whether a block is due, orders its
//! transactions, executes them, seals epochs and publishes the new head.
//!
//! ## Pipeline
//!
//! ```text
//!  begin_block ─► apply_event × N ─► end_block
//!                                       │ skip? ──► persist cheaters, done
//!                                       │ PREVRANDAO (reveal | legacy)
//!                                       │ txs: proposal | spill + scramble
//!                                       │ pre-internal txs, driver logs
//!                                       │ seal epoch? ──► new validators
//!                                       ▼
//!                         block-worker: user txs, post-internal txs,
//!                         commit, write block, statement, ChainHeadNotify
//! ```
//!
//! ## Guarantees
//!
//! - Blocks are written strictly in height order.
//! - Internal transaction failures never abort a block.
//! - `end_block` only reads state settled by the previous block.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod ports;
pub mod service;
mod worker;

pub use adapters::{Account, DriverTransactor, TargetRateBaseFee, TransferEvm};
pub use config::BlockProcessorConfig;
pub use domain::{
    apply_driver_logs, apply_genesis, DriverCall, DriverLog, PlacedTx, TxOrigin, DRIVER_ADDRESS,
    INTERNAL_SENDER,
};
pub use error::{BlockError, Result};
pub use feed::{ChainHeadFeed, ChainHeadNotify};
pub use metrics::BlockMetrics;
pub use ports::{
    BaseFeeCalculator, ConfirmedEventListener, Evm, EvmBlockContext, EvmProcessor,
    InternalCtx, InternalTransactor, ParentFeeInfo, SkipReason, StateReader, TxOutcome,
};
pub use service::{BlockAssembly, BlockProcessor, ConsensusBlock};

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 8);
    }
}
