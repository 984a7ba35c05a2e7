//! # Block and Epoch State
//!
//! Persistent bookkeeping updated by block assembly. [`BlockState`] changes
//! every block; [`EpochState`] only when an epoch is sealed.

use crate::event::GasPowerLeft;
use crate::primitives::{BlockNumber, Epoch, EventId, Gas, Hash, UnixNanos, ValidatorId, U256};
use crate::rules::Rules;
use crate::validators::{Validators, Weight};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of a finalized consensus block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCtx {
    /// Block height.
    pub idx: BlockNumber,
    /// Block time.
    pub time: UnixNanos,
    /// Atropos event that finalized the block.
    pub atropos: EventId,
}

/// Last known event of a validator, the anchor for gas power allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEventInfo {
    /// Event id, zero if none.
    pub id: EventId,
    /// Median time of the event.
    pub time: UnixNanos,
    /// Gas power left after the event.
    pub gas_power_left: GasPowerLeft,
}

/// Per-validator state updated every block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorBlockState {
    /// Latest confirmed event.
    pub last_event: ValidatorEventInfo,
    /// Accumulated online time within the epoch.
    pub uptime: UnixNanos,
    /// Time the validator was last seen online.
    pub last_online_time: UnixNanos,
    /// Last block that confirmed one of its events.
    pub last_block: BlockNumber,
    /// Fees originated by its transactions in this epoch.
    pub originated: U256,
}

/// Per-validator state fixed for an epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEpochState {
    /// Gas refunded at the start of the epoch.
    pub gas_refund: Gas,
    /// Last event of the previous epoch.
    pub prev_epoch_event: ValidatorEventInfo,
}

/// Stake and signing key of a validator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorProfile {
    /// Stake as reported by the driver contract.
    pub weight: U256,
    /// Encoded validator public key.
    pub pubkey: Vec<u8>,
}

/// Profiles keyed by validator id, iterated in id order.
pub type ValidatorProfiles = BTreeMap<ValidatorId, ValidatorProfile>;

/// Convert driver stakes into a consensus validator set.
///
/// Stakes above `u32::MAX` saturate; zero stakes drop the validator.
pub fn validators_from_profiles(profiles: &ValidatorProfiles) -> Validators {
    Validators::new(profiles.iter().map(|(id, p)| {
        let weight: Weight = if p.weight > U256::from(Weight::MAX) {
            Weight::MAX
        } else {
            p.weight.low_u32()
        };
        (*id, weight)
    }))
}

/// State updated every block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    /// Last produced block.
    pub last_block: BlockCtx,
    /// Hash of the last produced block.
    pub last_block_hash: Hash,
    /// State root after the last block.
    pub finalized_state_root: Hash,
    /// Gas used in the current epoch.
    pub epoch_gas: Gas,
    /// Cheaters observed in the current epoch, sorted.
    pub epoch_cheaters: Vec<ValidatorId>,
    /// Per-validator state, indexed like the epoch's validator set.
    pub validator_states: Vec<ValidatorBlockState>,
    /// Validator profiles that take effect at the next epoch.
    pub next_validator_profiles: ValidatorProfiles,
    /// Rules that take effect at the next epoch.
    pub dirty_rules: Option<Rules>,
    /// Epochs requested to be sealed by the driver contract.
    pub advance_epochs: u32,
    /// PREVRANDAO of the last block.
    pub prev_randao: Hash,
    /// Base fee of the last block.
    pub base_fee: U256,
}

impl BlockState {
    /// Merge cheaters into the sorted set; returns newly added ids.
    pub fn merge_cheaters(&mut self, cheaters: &[ValidatorId]) -> Vec<ValidatorId> {
        let mut added = Vec::new();
        for c in cheaters {
            if let Err(pos) = self.epoch_cheaters.binary_search(c) {
                self.epoch_cheaters.insert(pos, *c);
                added.push(*c);
            }
        }
        added
    }

    /// State of the validator at index `idx`, default if out of range.
    pub fn validator_state(&self, idx: usize) -> ValidatorBlockState {
        self.validator_states.get(idx).cloned().unwrap_or_default()
    }
}

/// State fixed for an epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochState {
    /// Epoch number.
    pub epoch: Epoch,
    /// Time the epoch started.
    pub epoch_start: UnixNanos,
    /// Time the previous epoch started.
    pub prev_epoch_start: UnixNanos,
    /// Last block of the previous epoch.
    pub epoch_start_block: BlockNumber,
    /// State root at the epoch start.
    pub epoch_state_root: Hash,
    /// Validator set.
    pub validators: Validators,
    /// Per-validator state, indexed like `validators`.
    pub validator_states: Vec<ValidatorEpochState>,
    /// Profiles of the validators.
    pub validator_profiles: ValidatorProfiles,
    /// Rules of the epoch.
    pub rules: Rules,
}

impl EpochState {
    /// Epoch state at genesis.
    pub fn genesis(
        epoch: Epoch,
        start: UnixNanos,
        profiles: ValidatorProfiles,
        rules: Rules,
    ) -> Self {
        let validators = validators_from_profiles(&profiles);
        Self {
            epoch,
            epoch_start: start,
            prev_epoch_start: start,
            epoch_start_block: 0,
            epoch_state_root: Hash::zero(),
            validator_states: vec![ValidatorEpochState::default(); validators.len()],
            validators,
            validator_profiles: profiles,
            rules,
        }
    }

    /// Time since the epoch started, saturating at zero.
    pub fn duration(&self, now: UnixNanos) -> UnixNanos {
        now.saturating_sub(self.epoch_start)
    }

    /// Epoch state of validator `id`, default for non-members.
    pub fn validator_state(&self, id: ValidatorId) -> ValidatorEpochState {
        self.validators
            .get_idx(id)
            .and_then(|i| self.validator_states.get(i).cloned())
            .unwrap_or_default()
    }

    /// Registered public key of validator `id`.
    pub fn pubkey(&self, id: ValidatorId) -> Option<&[u8]> {
        self.validator_profiles.get(&id).map(|p| p.pubkey.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(weight: u64) -> ValidatorProfile {
        ValidatorProfile {
            weight: U256::from(weight),
            pubkey: vec![0xc0; 66],
        }
    }

    #[test]
    fn test_merge_cheaters_keeps_sorted_set() {
        let mut bs = BlockState::default();
        assert_eq!(bs.merge_cheaters(&[5, 2]), vec![5, 2]);
        assert_eq!(bs.merge_cheaters(&[2, 3]), vec![3]);
        assert_eq!(bs.epoch_cheaters, vec![2, 3, 5]);
    }

    #[test]
    fn test_validators_from_profiles_saturates_and_drops_zero() {
        let mut profiles = ValidatorProfiles::new();
        profiles.insert(1, profile(10));
        profiles.insert(2, profile(0));
        profiles.insert(
            3,
            ValidatorProfile {
                weight: U256::MAX,
                pubkey: vec![],
            },
        );
        let v = validators_from_profiles(&profiles);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get_weight_by_id(3), Weight::MAX);
        assert!(!v.exists(2));
    }

    #[test]
    fn test_genesis_epoch_state() {
        let mut profiles = ValidatorProfiles::new();
        profiles.insert(1, profile(3));
        profiles.insert(2, profile(1));
        let es = EpochState::genesis(1, 100, profiles, Rules::fake_net());
        assert_eq!(es.validators.sorted_ids(), &[1, 2]);
        assert_eq!(es.validator_states.len(), 2);
        assert_eq!(es.duration(150), 50);
        assert_eq!(es.duration(50), 0);
        assert!(es.pubkey(1).is_some());
        assert!(es.pubkey(9).is_none());
    }

    #[test]
    fn test_state_bincode_roundtrip() {
        let mut profiles = ValidatorProfiles::new();
        profiles.insert(1, profile(3));
        let es = EpochState::genesis(4, 0, profiles, Rules::fake_net());
        let bytes = bincode::serialize(&es).unwrap();
        let back: EpochState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, es);
    }
}
