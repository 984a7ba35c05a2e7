//! # Epoch Sealer
//!
//! An epoch is sealed by the first block that sees any of:
//!
//! - epoch gas at or above `max_epoch_gas`
//! - epoch duration at or above `max_epoch_duration`
//! - a pending `AdvanceEpochs` request
//! - a cheater observed in the epoch
//!
//! Sealing promotes the pending validator profiles (minus cheaters) and the
//! pending rules into a new [`EpochState`], and records an [`UpgradeHeight`]
//! when the upgrade set changes.

use crate::error::{BlockError, Result};
use shared_types::{
    validators_from_profiles, BlockCtx, BlockState, EpochState, UpgradeHeight,
    ValidatorBlockState, ValidatorEpochState,
};

/// Result of sealing an epoch.
#[derive(Debug, Clone)]
pub struct SealOutcome {
    /// State of the new epoch.
    pub epoch_state: EpochState,
    /// Set when the new epoch runs a different upgrade set.
    pub upgrade_height: Option<UpgradeHeight>,
}

/// True if the block at `block_time` seals the epoch.
pub fn should_seal(bs: &BlockState, es: &EpochState, block_time: u64) -> bool {
    let rules = &es.rules.epochs;
    bs.epoch_gas >= rules.max_epoch_gas
        || es.duration(block_time) >= rules.max_epoch_duration
        || bs.advance_epochs > 0
        || !bs.epoch_cheaters.is_empty()
}

/// Seal the epoch at `block`, resetting the epoch part of `bs`.
pub fn seal_epoch(bs: &mut BlockState, es: &EpochState, block: &BlockCtx) -> Result<SealOutcome> {
    let mut profiles = if bs.next_validator_profiles.is_empty() {
        es.validator_profiles.clone()
    } else {
        std::mem::take(&mut bs.next_validator_profiles)
    };
    for cheater in &bs.epoch_cheaters {
        profiles.remove(cheater);
    }
    profiles.retain(|_, p| !p.weight.is_zero());

    let validators = validators_from_profiles(&profiles);
    if validators.is_empty() {
        return Err(BlockError::EmptyValidatorSet {
            epoch: es.epoch + 1,
        });
    }

    let rules = bs.dirty_rules.take().unwrap_or_else(|| es.rules.clone());
    let upgrade_height = (rules.upgrades != es.rules.upgrades).then(|| UpgradeHeight {
        upgrades: rules.upgrades,
        height: block.idx + 1,
        time: block.time + 1,
    });

    let mut epoch_states = Vec::with_capacity(validators.len());
    let mut block_states = Vec::with_capacity(validators.len());
    for id in validators.sorted_ids() {
        let previous = es
            .validators
            .get_idx(*id)
            .map(|i| bs.validator_state(i))
            .unwrap_or_default();
        epoch_states.push(ValidatorEpochState {
            gas_refund: 0,
            prev_epoch_event: previous.last_event,
        });
        block_states.push(ValidatorBlockState {
            last_online_time: previous.last_online_time,
            last_block: previous.last_block,
            ..Default::default()
        });
    }

    let epoch_state = EpochState {
        epoch: es.epoch + 1,
        epoch_start: block.time,
        prev_epoch_start: es.epoch_start,
        epoch_start_block: block.idx,
        epoch_state_root: bs.finalized_state_root,
        validators,
        validator_states: epoch_states,
        validator_profiles: profiles.clone(),
        rules,
    };

    bs.epoch_gas = 0;
    bs.epoch_cheaters.clear();
    bs.advance_epochs = bs.advance_epochs.saturating_sub(1);
    bs.validator_states = block_states;
    bs.next_validator_profiles = profiles;

    Ok(SealOutcome {
        epoch_state,
        upgrade_height,
    })
}
