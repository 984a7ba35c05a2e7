//! Genesis block and initial states.

use crate::error::{BlockError, Result};
use shared_types::{
    Block, BlockBuilder, BlockCtx, BlockState, EpochState, EventId, Hash, Rules, UnixNanos,
    UpgradeHeight, ValidatorBlockState, ValidatorProfiles,
};
use sn_09_store::{BlockStatement, Store};
use tracing::info;

/// First epoch of a chain.
pub const GENESIS_EPOCH: u32 = 1;

/// Write block 0, the first epoch and the initial upgrade height.
///
/// `state_root` is the root of the allocated world state.
pub fn apply_genesis(
    store: &Store,
    state_root: Hash,
    profiles: ValidatorProfiles,
    rules: Rules,
    time: UnixNanos,
) -> Result<Block> {
    let es = EpochState::genesis(GENESIS_EPOCH, time, profiles.clone(), rules);
    if es.validators.is_empty() {
        return Err(BlockError::EmptyValidatorSet {
            epoch: GENESIS_EPOCH,
        });
    }

    let min_base_fee = es.rules.economy.min_base_fee;
    let block = BlockBuilder::new(0)
        .with_time(time, time)
        .with_gas_limit(es.rules.blocks.max_block_gas)
        .with_base_fee(min_base_fee)
        .with_state_root(state_root)
        .build();

    let bs = BlockState {
        last_block: BlockCtx {
            idx: 0,
            time,
            atropos: EventId::zero(),
        },
        last_block_hash: block.hash,
        finalized_state_root: state_root,
        validator_states: vec![ValidatorBlockState::default(); es.validators.len()],
        next_validator_profiles: profiles,
        base_fee: min_base_fee,
        ..Default::default()
    };
    let upgrades = UpgradeHeight {
        upgrades: es.rules.upgrades,
        height: 0,
        time,
    };

    info!(
        hash = ?block.hash,
        validators = es.validators.len(),
        network_id = es.rules.network_id,
        "[sn-08] 🌱 Genesis applied"
    );
    store.apply_genesis(&block, bs, es, upgrades)?;
    store.set_block_statement(&BlockStatement::of(&block))?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ValidatorProfile, NANOS_PER_SEC, U256};
    use sn_09_store::{MemoryProducer, MemoryStore};
    use std::sync::Arc;

    fn store() -> Store {
        Store::open(Arc::new(MemoryStore::new()), Arc::new(MemoryProducer)).unwrap()
    }

    #[test]
    fn test_genesis_writes_block_and_states() {
        let store = store();
        let mut profiles = ValidatorProfiles::new();
        profiles.insert(
            1,
            ValidatorProfile {
                weight: U256::from(100u64),
                pubkey: vec![0xc0; 65],
            },
        );
        let time = 10 * NANOS_PER_SEC;
        let block = apply_genesis(
            &store,
            Hash::repeat_byte(7),
            profiles,
            Rules::fake_net(),
            time,
        )
        .unwrap();

        assert_eq!(store.block(0).unwrap(), Some(block.clone()));
        let bs = store.block_state();
        assert_eq!(bs.last_block_hash, block.hash);
        assert_eq!(bs.finalized_state_root, Hash::repeat_byte(7));
        assert_eq!(bs.base_fee, Rules::fake_net().economy.min_base_fee);
        assert_eq!(bs.validator_states.len(), 1);

        let es = store.epoch_state();
        assert_eq!(es.epoch, GENESIS_EPOCH);
        assert_eq!(es.epoch_start, time);
        assert_eq!(store.upgrade_heights().len(), 1);
        assert!(store.is_initialized().unwrap());
    }

    #[test]
    fn test_genesis_without_validators_fails() {
        let err = apply_genesis(
            &store(),
            Hash::zero(),
            ValidatorProfiles::new(),
            Rules::fake_net(),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, BlockError::EmptyValidatorSet { epoch: 1 }));
    }
}
