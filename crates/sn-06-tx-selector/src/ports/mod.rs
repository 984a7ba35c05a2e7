//! Ports of the selector.

pub mod runner;

pub use runner::{RunOutcome, TxRunner};
