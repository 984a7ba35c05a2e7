//! Adapters for the emitter ports.

pub mod clock;
pub mod evm_runner;

pub use clock::{ManualClock, SystemClock};
pub use evm_runner::EvmTxRunner;
