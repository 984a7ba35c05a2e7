//! Proposal filling on a throwaway EVM block.

use shared_types::{Address, Transaction};
use sn_06_tx_selector::{RunOutcome, TxRunner};
use sn_08_block_processor::{EvmProcessor, SkipReason, StateReader, TxOutcome};
use std::collections::HashMap;
use std::sync::Arc;

/// [`TxRunner`] over an uncommitted [`EvmProcessor`]. Nothing is committed;
/// dropping the runner drops the scratch state.
pub struct EvmTxRunner {
    processor: Box<dyn EvmProcessor>,
    state: Arc<dyn StateReader>,
    nonces: HashMap<Address, u64>,
}

impl EvmTxRunner {
    /// Runner on top of `state`, executing in `processor`.
    pub fn new(processor: Box<dyn EvmProcessor>, state: Arc<dyn StateReader>) -> Self {
        Self {
            processor,
            state,
            nonces: HashMap::new(),
        }
    }
}

impl TxRunner for EvmTxRunner {
    fn run(&mut self, tx: &Transaction, sender: Address) -> RunOutcome {
        let expected = self.nonce(&sender);
        if tx.nonce < expected {
            return RunOutcome::NonceTooLow;
        }
        if tx.nonce > expected {
            return RunOutcome::NonceGap;
        }
        match self.processor.execute(tx, sender, false) {
            TxOutcome::Executed(receipt) => {
                self.nonces.insert(sender, expected + 1);
                RunOutcome::Included {
                    gas_used: receipt.gas_used,
                }
            }
            TxOutcome::Skipped(SkipReason::Nonce) => RunOutcome::NonceGap,
            TxOutcome::Skipped(_) => RunOutcome::Rejected,
        }
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.nonces
            .get(address)
            .copied()
            .unwrap_or_else(|| self.state.nonce(address))
    }
}
