//! Configuration of block assembly.

use serde::Deserialize;

/// Block processor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockProcessorConfig {
    /// Chain head notifications buffered per subscriber.
    pub feed_capacity: usize,
    /// Gas per second the base fee steers towards.
    pub target_gas_rate: u64,
    /// Largest base fee change per block is `1 / denominator`.
    pub base_fee_change_denominator: u64,
    /// Gas granted to each internal transaction.
    pub internal_tx_gas: u64,
}

impl Default for BlockProcessorConfig {
    fn default() -> Self {
        Self {
            feed_capacity: 256,
            target_gas_rate: 15_000_000,
            base_fee_change_denominator: 8,
            internal_tx_gas: 500_000_000,
        }
    }
}
