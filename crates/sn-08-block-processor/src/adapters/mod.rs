//! Reference adapters for the block processor ports.

pub mod base_fee;
pub mod transactor;
pub mod transfer_evm;

pub use base_fee::TargetRateBaseFee;
pub use transactor::DriverTransactor;
pub use transfer_evm::{Account, TransferEvm};
