//! Target-rate base fee.
//!
//! The parent's gas usage is compared with `target_gas_rate · duration`.
//! The fee moves towards the target by at most `1 / denominator` per block
//! and never drops below `min_base_fee`.

use crate::ports::{BaseFeeCalculator, ParentFeeInfo};
use shared_types::{Rules, NANOS_PER_SEC, U256};

/// Default [`BaseFeeCalculator`].
#[derive(Debug, Clone, Copy)]
pub struct TargetRateBaseFee {
    target_gas_rate: u64,
    denominator: u64,
}

impl TargetRateBaseFee {
    /// Calculator steering towards `target_gas_rate` gas per second.
    pub fn new(target_gas_rate: u64, denominator: u64) -> Self {
        Self {
            target_gas_rate,
            denominator: denominator.max(1),
        }
    }
}

impl BaseFeeCalculator for TargetRateBaseFee {
    fn next_base_fee(&self, parent: &ParentFeeInfo, rules: &Rules) -> U256 {
        let floor = rules.economy.min_base_fee;
        let base = parent.base_fee.max(floor);
        let target = (U256::from(self.target_gas_rate) * U256::from(parent.duration)
            / U256::from(NANOS_PER_SEC))
        .max(U256::one());
        let used = U256::from(parent.gas_used);
        let denominator = U256::from(self.denominator);
        let max_delta = base / denominator;

        let next = if used > target {
            let delta = (base * (used - target) / target / denominator).min(max_delta);
            base + delta.max(U256::one())
        } else if used < target {
            let delta = (base * (target - used) / target / denominator).min(max_delta);
            base.saturating_sub(delta)
        } else {
            base
        };
        next.max(floor)
    }
}
