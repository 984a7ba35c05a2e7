//! # SN-03: Event Checks
//!
//! ## Purpose
//!
//! Decides whether a received event may enter the DAG. Cheap checks run
//! inline; signature and sender recovery run on a worker pool.
//!
//! ## Pipeline
//!
//! ```text
//!   event ─► basic ─► epoch ─► parents ─► gas power ─► proposal   (light, inline)
//!                                                        │
//!                                                        ▼
//!                                   HeavyCheckPool: signature, senders,
//!                                   payload hash ─► on_validated(result)
//! ```
//!
//! Every checker is a pure function of the event and a [`Reader`] snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkers;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod ports;

pub use checkers::Checkers;
pub use config::HeavyCheckConfig;
pub use domain::frame::calc_frame;
pub use domain::gas_power::{
    alloc_per_sec, calc_gas_power, calc_gas_power_used, calc_gas_power_used_mutable,
};
pub use error::{
    BasicError, CheckError, EpochError, GasPowerError, ParentsError, ProposalError, Result,
};
pub use metrics::CheckMetrics;
pub use pool::{HeavyCheckPool, OnValidated};
pub use ports::Reader;

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 3);
    }
}
