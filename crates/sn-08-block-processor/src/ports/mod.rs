//! Ports of the block processor.
//!
//! - [`evm`]: transaction execution against the world state
//! - [`base_fee`]: base fee of the next block
//! - [`transactor`]: internal (system) transactions
//! - [`listener`]: observers of confirmed events

pub mod base_fee;
pub mod evm;
pub mod listener;
pub mod transactor;

pub use base_fee::{BaseFeeCalculator, ParentFeeInfo};
pub use evm::{Evm, EvmBlockContext, EvmProcessor, SkipReason, StateReader, TxOutcome};
pub use listener::ConfirmedEventListener;
pub use transactor::{InternalCtx, InternalTransactor};
