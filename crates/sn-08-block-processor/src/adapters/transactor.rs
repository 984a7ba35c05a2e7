//! Driver-backed internal transactions.

use crate::domain::driver::{DriverCall, DRIVER_ADDRESS};
use crate::ports::{InternalCtx, InternalTransactor};
use shared_types::{Gas, Transaction, TxType};

/// Seals the epoch on the driver contract before user transactions run.
#[derive(Debug, Clone, Copy)]
pub struct DriverTransactor {
    gas: Gas,
}

impl DriverTransactor {
    /// Transactor granting `gas` to each internal transaction.
    pub fn new(gas: Gas) -> Self {
        Self { gas }
    }

    fn call(&self, call: DriverCall, nonce: u64) -> Transaction {
        Transaction {
            tx_type: TxType::Legacy,
            nonce,
            gas: self.gas,
            to: Some(DRIVER_ADDRESS),
            data: call.encode(),
            ..Default::default()
        }
    }
}

impl InternalTransactor for DriverTransactor {
    fn pre_internal(&self, ctx: &InternalCtx<'_>) -> Vec<Transaction> {
        if !ctx.sealing {
            return Vec::new();
        }
        vec![self.call(DriverCall::SealEpoch(ctx.epoch_state.epoch), ctx.block.idx)]
    }

    fn post_internal(&self, _ctx: &InternalCtx<'_>) -> Vec<Transaction> {
        Vec::new()
    }
}
