//! Rebuild the in-memory world state after a restart by re-executing the
//! stored blocks on top of the genesis allocation.

use crate::error::Result;
use shared_crypto::SenderCache;
use shared_types::ChainConfig;
use sn_08_block_processor::{
    Evm, EvmBlockContext, StateReader, TransferEvm, TxOutcome, INTERNAL_SENDER,
};
use sn_09_store::Store;
use tracing::{info, warn};

/// Re-execute blocks `1..=head` into `evm`. Returns the number of blocks
/// replayed. A state root differing from the stored one is logged, not
/// fatal: the fake net keeps running on the recomputed state.
pub fn replay_blocks(store: &Store, evm: &TransferEvm, senders: &SenderCache) -> Result<u64> {
    let head = store.block_state().last_block.idx;
    let es = store.epoch_state();
    let chain = ChainConfig::materialize(es.rules.network_id, &store.upgrade_heights());
    let mut replayed = 0;
    for number in 1..=head {
        let Some(block) = store.block(number)? else {
            warn!(number, "[node] ⚠️ Block missing, replay stopped");
            break;
        };
        let mut processor = evm.begin(EvmBlockContext {
            number,
            time: block.time,
            prev_randao: block.prev_randao,
            base_fee: block.base_fee,
            gas_limit: block.gas_limit,
            chain: chain.clone(),
            rules: es.rules.clone(),
        });
        for tx in &block.transactions {
            let outcome = match senders.sender(tx) {
                Ok(sender) => processor.execute(tx, sender, false),
                Err(_) => processor.execute(tx, INTERNAL_SENDER, true),
            };
            if let TxOutcome::Skipped(reason) = outcome {
                warn!(number, tx = ?tx.hash(), ?reason, "[node] ⚠️ Stored transaction skipped on replay");
            }
        }
        let root = processor.commit();
        if root != block.state_root {
            warn!(number, expected = ?block.state_root, got = ?root, "[node] ⚠️ Replayed state root differs");
        }
        replayed += 1;
    }
    if replayed > 0 {
        info!(blocks = replayed, state_root = ?evm.state_root(), "[node] 🔁 World state replayed");
    }
    Ok(replayed)
}
