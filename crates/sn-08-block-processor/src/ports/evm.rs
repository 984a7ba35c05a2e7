//! Execution port.
//!
//! The interpreter is an external collaborator. Block assembly only needs to
//! open a block, run transactions one by one and commit the result.

use shared_types::{
    Address, BlockNumber, ChainConfig, Gas, Hash, Receipt, Rules, Transaction, UnixNanos, U256,
};

/// Header values visible to executing transactions.
#[derive(Debug, Clone)]
pub struct EvmBlockContext {
    /// Block height.
    pub number: BlockNumber,
    /// Block time.
    pub time: UnixNanos,
    /// PREVRANDAO of the block.
    pub prev_randao: Hash,
    /// Base fee of the block.
    pub base_fee: U256,
    /// Block gas limit.
    pub gas_limit: Gas,
    /// Fork schedule.
    pub chain: ChainConfig,
    /// Rules of the current epoch.
    pub rules: Rules,
}

/// Why the EVM refused to include a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nonce does not match the account.
    Nonce,
    /// Balance does not cover value plus fees.
    Balance,
    /// Fee cap below the base fee.
    FeeCap,
    /// Gas below intrinsic gas or above what the block has left.
    Gas,
}

/// Result of running one transaction.
#[derive(Debug, Clone)]
pub enum TxOutcome {
    /// Included with a receipt; the receipt may carry a failed status.
    Executed(Receipt),
    /// Not included.
    Skipped(SkipReason),
}

/// Read access to committed account state.
pub trait StateReader: Send + Sync {
    /// Next nonce of `address`.
    fn nonce(&self, address: &Address) -> u64;

    /// Balance of `address`.
    fn balance(&self, address: &Address) -> U256;

    /// Root of the committed state.
    fn state_root(&self) -> Hash;
}

/// World state able to open blocks.
pub trait Evm: StateReader {
    /// Open a block on top of the committed state.
    fn begin(&self, ctx: EvmBlockContext) -> Box<dyn EvmProcessor>;
}

/// Execution of one block.
pub trait EvmProcessor: Send {
    /// Run `tx` as `sender`. Internal transactions pay no fees and skip the
    /// nonce check.
    fn execute(&mut self, tx: &Transaction, sender: Address, internal: bool) -> TxOutcome;

    /// Gas used so far.
    fn gas_used(&self) -> Gas;

    /// Commit the block and return the new state root.
    fn commit(self: Box<Self>) -> Hash;
}
