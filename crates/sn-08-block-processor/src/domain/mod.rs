//! Block assembly domain logic.
//!
//! Everything here is a pure function of its inputs; the service wires it to
//! the store, the EVM and the worker thread.

pub mod assembly;
pub mod driver;
pub mod genesis;
pub mod sealer;

pub use assembly::{
    block_time, legacy_transactions, proposal_transactions, should_skip, spill_events, PlacedTx,
    SkipInputs, TxOrigin, BLOCK_HEADER_SIZE_BOUND,
};
pub use driver::{apply_driver_logs, DriverCall, DriverLog, DRIVER_ADDRESS, INTERNAL_SENDER};
pub use genesis::apply_genesis;
pub use sealer::{seal_epoch, should_seal, SealOutcome};
