//! Base fee port.

use shared_types::{Gas, Rules, UnixNanos, U256};

/// Parent block values the base fee depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentFeeInfo {
    /// Base fee of the parent.
    pub base_fee: U256,
    /// Gas used by the parent.
    pub gas_used: Gas,
    /// Time between the parent and its own parent.
    pub duration: UnixNanos,
}

/// Computes the base fee of the next block.
pub trait BaseFeeCalculator: Send + Sync {
    /// Base fee of the child of `parent` under `rules`.
    fn next_base_fee(&self, parent: &ParentFeeInfo, rules: &Rules) -> U256;
}
