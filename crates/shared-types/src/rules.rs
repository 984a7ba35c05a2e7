//! # Network Rules
//!
//! Per-epoch policy record. Rules change only at epoch boundaries, via the
//! driver contract's `UpdateNetworkRules(bytes)` log carrying a JSON diff.
//!
//! ## Encoding
//!
//! `[version: u8] ‖ rlp(rules)`. Version 0 predates the Allegro upgrade
//! flags; decoding it yields those flags as `false`. Writers always emit the
//! latest version.
//!
//! ## Validation
//!
//! [`Rules::validate`] collects every violated constraint into one
//! [`RulesValidationError`].

use crate::errors::{RulesValidationError, TypesError};
use crate::primitives::{expect_list_len, Gas, UnixNanos, NANOS_PER_MILLI, NANOS_PER_SEC, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Current rules encoding version.
pub const RULES_VERSION: u8 = 1;

/// Lowest accepted `Blocks.MaxBlockGas`.
pub const MIN_MAX_BLOCK_GAS: u64 = 5_000_000_000;

/// Highest accepted `Blocks.MaxBlockGas`; must fit a signed 64-bit integer.
pub const MAX_MAX_BLOCK_GAS: u64 = i64::MAX as u64;

/// One Gwei in wei.
pub const GWEI: u64 = 1_000_000_000;

/// Highest accepted `Economy.MinBaseFee`.
pub const MAX_MIN_BASE_FEE_GWEI: u64 = 1_000;

/// Upper bound on the emitter interval.
pub const MAX_EMITTER_INTERVAL: UnixNanos = 10 * NANOS_PER_SEC;

/// Feature switches. Each upgrade requires its predecessors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Upgrades {
    /// EIP-2929 and friends.
    pub berlin: bool,
    /// EIP-1559.
    pub london: bool,
    /// Lachesis light repeater.
    pub llr: bool,
    /// Sonic launch fork.
    pub sonic: bool,
    /// Allegro (Prague EVM, version-3 events possible).
    pub allegro: bool,
    /// Brio (block size limit).
    pub brio: bool,
    /// Single-proposer block formation.
    pub single_proposer_block_formation: bool,
    /// Gas subsidies for sponsored transactions.
    pub gas_subsidies: bool,
}

impl Upgrades {
    /// Sonic launch set.
    pub fn sonic() -> Self {
        Self {
            berlin: true,
            london: true,
            llr: false,
            sonic: true,
            ..Default::default()
        }
    }

    /// Sonic plus Allegro.
    pub fn allegro() -> Self {
        Self {
            allegro: true,
            ..Self::sonic()
        }
    }

    /// Allegro plus Brio.
    pub fn brio() -> Self {
        Self {
            brio: true,
            ..Self::allegro()
        }
    }

    /// Allegro with single-proposer block formation.
    pub fn single_proposer() -> Self {
        Self {
            single_proposer_block_formation: true,
            ..Self::allegro()
        }
    }

    /// Event version events must carry under these upgrades.
    pub fn expected_event_version(&self) -> u8 {
        if self.single_proposer_block_formation {
            crate::event::EVENT_VERSION_3
        } else {
            crate::event::EVENT_VERSION_2
        }
    }

    fn append_versioned(&self, s: &mut RlpStream, version: u8) {
        let flags: &[bool] = if version == 0 {
            &[self.berlin, self.london, self.llr, self.sonic]
        } else {
            &[
                self.berlin,
                self.london,
                self.llr,
                self.sonic,
                self.allegro,
                self.brio,
                self.single_proposer_block_formation,
                self.gas_subsidies,
            ]
        };
        s.begin_list(flags.len());
        for f in flags {
            s.append(f);
        }
    }

    fn decode_versioned(rlp: &Rlp, version: u8) -> Result<Self, DecoderError> {
        let expected = if version == 0 { 4 } else { 8 };
        expect_list_len(rlp, expected)?;
        let mut u = Upgrades {
            berlin: rlp.val_at(0)?,
            london: rlp.val_at(1)?,
            llr: rlp.val_at(2)?,
            sonic: rlp.val_at(3)?,
            ..Default::default()
        };
        if version > 0 {
            u.allegro = rlp.val_at(4)?;
            u.brio = rlp.val_at(5)?;
            u.single_proposer_block_formation = rlp.val_at(6)?;
            u.gas_subsidies = rlp.val_at(7)?;
        }
        Ok(u)
    }
}

impl Encodable for Upgrades {
    fn rlp_append(&self, s: &mut RlpStream) {
        self.append_versioned(s, RULES_VERSION);
    }
}

impl Decodable for Upgrades {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Self::decode_versioned(rlp, RULES_VERSION)
    }
}

/// DAG shape limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DagRules {
    /// Maximum parents per event.
    pub max_parents: u32,
    /// Parents that cost no gas.
    pub max_free_parents: u32,
    /// Maximum extra-data bytes.
    pub max_extra_data: u32,
}

/// Emitter pacing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmitterRules {
    /// Normal emit interval.
    pub interval: UnixNanos,
    /// Confirmation lag after which the network counts as stalled.
    pub stall_threshold: UnixNanos,
    /// Emit interval while stalled.
    pub stalled_interval: UnixNanos,
}

/// Epoch sealing triggers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EpochsRules {
    /// Gas after which the epoch is sealed.
    pub max_epoch_gas: Gas,
    /// Duration after which the epoch is sealed.
    pub max_epoch_duration: UnixNanos,
}

/// Block production limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlocksRules {
    /// Block gas limit.
    pub max_block_gas: Gas,
    /// Empty blocks are skipped until this much time has passed.
    pub max_empty_block_skip_period: UnixNanos,
}

/// Per-item event gas costs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasRules {
    /// Upper bound on `gas_power_used` of one event.
    pub max_event_gas: Gas,
    /// Flat cost of an event.
    pub event_gas: Gas,
    /// Cost per non-free parent.
    pub parent_gas: Gas,
    /// Cost per extra-data byte.
    pub extra_data_gas: Gas,
    /// Flat cost of a block-votes record.
    pub block_votes_base_gas: Gas,
    /// Cost per block vote.
    pub block_vote_gas: Gas,
    /// Cost of an epoch vote.
    pub epoch_vote_gas: Gas,
    /// Cost per misbehaviour proof.
    pub misbehaviour_proof_gas: Gas,
}

/// Allocation schedule of one gas power window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasPowerRules {
    /// Network-wide allocation per second, split by stake.
    pub alloc_per_sec: u64,
    /// Allocation cap, in nanoseconds worth of allocation.
    pub max_alloc_period: UnixNanos,
    /// Allocation granted to a validator's first event.
    pub startup_alloc_period: UnixNanos,
    /// Floor on the startup allocation.
    pub min_startup_gas: u64,
    /// Floor on a validator's per-second allocation.
    pub min_ensured_alloc: u64,
}

/// Economic parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EconomyRules {
    /// Missed-block tolerance for validator uptime accounting.
    pub block_missed_slack: u64,
    /// Event gas costs.
    pub gas: GasRules,
    /// Minimum accepted fee cap for event transactions.
    pub min_gas_price: U256,
    /// Floor of the block base fee.
    pub min_base_fee: U256,
    /// Short window gas power.
    pub short_gas_power: GasPowerRules,
    /// Long window gas power.
    pub long_gas_power: GasPowerRules,
}

impl EconomyRules {
    /// Gas power rules for bucket `i` (0 short, 1 long).
    pub fn gas_power(&self, i: usize) -> &GasPowerRules {
        if i == crate::event::SHORT_TERM_GAS {
            &self.short_gas_power
        } else {
            &self.long_gas_power
        }
    }
}

/// Full network rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rules {
    /// Human-readable network name.
    pub name: String,
    /// Chain id.
    #[serde(rename = "NetworkID")]
    pub network_id: u64,
    /// DAG limits.
    pub dag: DagRules,
    /// Emitter pacing.
    pub emitter: EmitterRules,
    /// Epoch sealing.
    pub epochs: EpochsRules,
    /// Block limits.
    pub blocks: BlocksRules,
    /// Economy.
    pub economy: EconomyRules,
    /// Upgrade flags.
    pub upgrades: Upgrades,
}

impl Default for Rules {
    fn default() -> Self {
        Self::fake_net()
    }
}

impl Rules {
    /// Rules for a local single-host network.
    pub fn fake_net() -> Self {
        let gas_power = |alloc_per_sec: u64| GasPowerRules {
            alloc_per_sec,
            max_alloc_period: 5 * NANOS_PER_SEC,
            startup_alloc_period: NANOS_PER_SEC,
            min_startup_gas: 20 * 28_000,
            min_ensured_alloc: 0,
        };
        Self {
            name: "fake".into(),
            network_id: 0xfa3,
            dag: DagRules {
                max_parents: 10,
                max_free_parents: 3,
                max_extra_data: 128,
            },
            emitter: EmitterRules {
                interval: 200 * NANOS_PER_MILLI,
                stall_threshold: 30 * NANOS_PER_SEC,
                stalled_interval: 60 * NANOS_PER_SEC,
            },
            epochs: EpochsRules {
                max_epoch_gas: 300_000_000_000,
                max_epoch_duration: 600 * NANOS_PER_SEC,
            },
            blocks: BlocksRules {
                max_block_gas: MIN_MAX_BLOCK_GAS,
                max_empty_block_skip_period: 3 * NANOS_PER_SEC,
            },
            economy: EconomyRules {
                block_missed_slack: 50,
                gas: GasRules {
                    max_event_gas: 10_000_000_000,
                    event_gas: 28_000,
                    parent_gas: 2_400,
                    extra_data_gas: 25,
                    block_votes_base_gas: 1_024,
                    block_vote_gas: 512,
                    epoch_vote_gas: 1_536,
                    misbehaviour_proof_gas: 71_536,
                },
                min_gas_price: U256::from(GWEI),
                min_base_fee: U256::from(GWEI),
                short_gas_power: gas_power(20_000_000_000),
                long_gas_power: gas_power(10_000_000_000),
            },
            upgrades: Upgrades::sonic(),
        }
    }

    /// Copy with different upgrades.
    pub fn with_upgrades(mut self, upgrades: Upgrades) -> Self {
        self.upgrades = upgrades;
        self
    }

    /// Encode with the version prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![RULES_VERSION];
        let mut s = RlpStream::new();
        self.append_versioned(&mut s, RULES_VERSION);
        out.extend_from_slice(&s.out());
        out
    }

    /// Decode any known version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let version = *bytes.first().ok_or(TypesError::Empty)?;
        if version > RULES_VERSION {
            return Err(TypesError::UnsupportedRulesVersion(version));
        }
        let rlp = Rlp::new(&bytes[1..]);
        Ok(Self::decode_versioned(&rlp, version)?)
    }

    /// Encode as a specific older version.
    pub fn to_bytes_version(&self, version: u8) -> Vec<u8> {
        let mut out = vec![version];
        let mut s = RlpStream::new();
        self.append_versioned(&mut s, version);
        out.extend_from_slice(&s.out());
        out
    }

    /// Apply a JSON diff: fields present in `diff` override this copy.
    pub fn apply_json_update(&self, diff: &[u8]) -> Result<Rules, TypesError> {
        let patch: serde_json::Value =
            serde_json::from_slice(diff).map_err(|e| TypesError::RulesJson(e.to_string()))?;
        let mut base =
            serde_json::to_value(self).map_err(|e| TypesError::RulesJson(e.to_string()))?;
        merge_json(&mut base, patch);
        serde_json::from_value(base).map_err(|e| TypesError::RulesJson(e.to_string()))
    }

    /// Check `self` as a successor of `previous`.
    pub fn validate(&self, previous: &Rules) -> Result<(), RulesValidationError> {
        let mut issues = Vec::new();

        if self.network_id != previous.network_id {
            issues.push(format!(
                "NetworkID cannot change ({} -> {})",
                previous.network_id, self.network_id
            ));
        }

        if self.dag.max_parents < 2 {
            issues.push("Dag.MaxParents is too low".to_string());
        }
        if self.dag.max_free_parents > self.dag.max_parents {
            issues.push("Dag.MaxFreeParents exceeds Dag.MaxParents".to_string());
        }
        if self.dag.max_extra_data > 1 << 20 {
            issues.push("Dag.MaxExtraData is too high".to_string());
        }

        if self.emitter.interval > MAX_EMITTER_INTERVAL {
            issues.push("Emitter.Interval is too high".to_string());
        }
        if self.emitter.stalled_interval < self.emitter.interval {
            issues.push("Emitter.StalledInterval is below Emitter.Interval".to_string());
        }

        if self.blocks.max_block_gas < MIN_MAX_BLOCK_GAS {
            issues.push(format!(
                "Blocks.MaxBlockGas is too low ({} < {})",
                self.blocks.max_block_gas, MIN_MAX_BLOCK_GAS
            ));
        }
        if self.blocks.max_block_gas > MAX_MAX_BLOCK_GAS {
            issues.push("Blocks.MaxBlockGas is too high".to_string());
        }
        if self.epochs.max_epoch_gas < self.blocks.max_block_gas {
            issues.push("Epochs.MaxEpochGas is below Blocks.MaxBlockGas".to_string());
        }
        if self.epochs.max_epoch_duration == 0 {
            issues.push("Epochs.MaxEpochDuration must be positive".to_string());
        }

        if self.economy.min_base_fee > U256::from(MAX_MIN_BASE_FEE_GWEI) * U256::from(GWEI) {
            issues.push("Economy.MinBaseFee is too high".to_string());
        }
        let gas = &self.economy.gas;
        if gas.max_event_gas < gas.event_gas {
            issues.push("Economy.Gas.MaxEventGas is below Economy.Gas.EventGas".to_string());
        }
        for (name, gp) in [
            ("ShortGasPower", &self.economy.short_gas_power),
            ("LongGasPower", &self.economy.long_gas_power),
        ] {
            if gp.alloc_per_sec == 0 {
                issues.push(format!("Economy.{name}.AllocPerSec must be positive"));
            }
            if gp.max_alloc_period < NANOS_PER_SEC {
                issues.push(format!("Economy.{name}.MaxAllocPeriod is too low"));
            }
        }

        issues.extend(self.upgrades.transition_issues(&previous.upgrades));

        if issues.is_empty() {
            Ok(())
        } else {
            Err(RulesValidationError { issues })
        }
    }

    fn append_versioned(&self, s: &mut RlpStream, version: u8) {
        s.begin_list(8);
        s.append(&self.name);
        s.append(&self.network_id);
        s.begin_list(3);
        s.append(&self.dag.max_parents);
        s.append(&self.dag.max_free_parents);
        s.append(&self.dag.max_extra_data);
        s.begin_list(3);
        s.append(&self.emitter.interval);
        s.append(&self.emitter.stall_threshold);
        s.append(&self.emitter.stalled_interval);
        s.begin_list(2);
        s.append(&self.epochs.max_epoch_gas);
        s.append(&self.epochs.max_epoch_duration);
        s.begin_list(2);
        s.append(&self.blocks.max_block_gas);
        s.append(&self.blocks.max_empty_block_skip_period);
        let e = &self.economy;
        s.begin_list(6);
        s.append(&e.block_missed_slack);
        s.begin_list(8);
        s.append(&e.gas.max_event_gas);
        s.append(&e.gas.event_gas);
        s.append(&e.gas.parent_gas);
        s.append(&e.gas.extra_data_gas);
        s.append(&e.gas.block_votes_base_gas);
        s.append(&e.gas.block_vote_gas);
        s.append(&e.gas.epoch_vote_gas);
        s.append(&e.gas.misbehaviour_proof_gas);
        s.append(&e.min_gas_price);
        s.append(&e.min_base_fee);
        append_gas_power(s, &e.short_gas_power);
        append_gas_power(s, &e.long_gas_power);
        self.upgrades.append_versioned(s, version);
    }

    fn decode_versioned(rlp: &Rlp, version: u8) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 8)?;
        let dag = rlp.at(2)?;
        expect_list_len(&dag, 3)?;
        let emitter = rlp.at(3)?;
        expect_list_len(&emitter, 3)?;
        let epochs = rlp.at(4)?;
        expect_list_len(&epochs, 2)?;
        let blocks = rlp.at(5)?;
        expect_list_len(&blocks, 2)?;
        let economy = rlp.at(6)?;
        expect_list_len(&economy, 6)?;
        let gas = economy.at(1)?;
        expect_list_len(&gas, 8)?;

        Ok(Self {
            name: rlp.val_at(0)?,
            network_id: rlp.val_at(1)?,
            dag: DagRules {
                max_parents: dag.val_at(0)?,
                max_free_parents: dag.val_at(1)?,
                max_extra_data: dag.val_at(2)?,
            },
            emitter: EmitterRules {
                interval: emitter.val_at(0)?,
                stall_threshold: emitter.val_at(1)?,
                stalled_interval: emitter.val_at(2)?,
            },
            epochs: EpochsRules {
                max_epoch_gas: epochs.val_at(0)?,
                max_epoch_duration: epochs.val_at(1)?,
            },
            blocks: BlocksRules {
                max_block_gas: blocks.val_at(0)?,
                max_empty_block_skip_period: blocks.val_at(1)?,
            },
            economy: EconomyRules {
                block_missed_slack: economy.val_at(0)?,
                gas: GasRules {
                    max_event_gas: gas.val_at(0)?,
                    event_gas: gas.val_at(1)?,
                    parent_gas: gas.val_at(2)?,
                    extra_data_gas: gas.val_at(3)?,
                    block_votes_base_gas: gas.val_at(4)?,
                    block_vote_gas: gas.val_at(5)?,
                    epoch_vote_gas: gas.val_at(6)?,
                    misbehaviour_proof_gas: gas.val_at(7)?,
                },
                min_gas_price: economy.val_at(2)?,
                min_base_fee: economy.val_at(3)?,
                short_gas_power: decode_gas_power(&economy.at(4)?)?,
                long_gas_power: decode_gas_power(&economy.at(5)?)?,
            },
            upgrades: Upgrades::decode_versioned(&rlp.at(7)?, version)?,
        })
    }
}

impl Upgrades {
    /// Constraint violations of moving from `previous` to `self`.
    pub fn transition_issues(&self, previous: &Upgrades) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.sonic {
            issues.push("Upgrades.Sonic cannot be disabled".to_string());
        }
        if self.allegro && !self.sonic {
            issues.push("Upgrades.Allegro requires Upgrades.Sonic".to_string());
        }
        if self.brio && !self.allegro {
            issues.push("Upgrades.Brio requires Upgrades.Allegro".to_string());
        }
        if self.single_proposer_block_formation && !self.allegro {
            issues.push("Upgrades.SingleProposerBlockFormation requires Upgrades.Allegro".to_string());
        }
        if self.gas_subsidies && !self.allegro {
            issues.push("Upgrades.GasSubsidies requires Upgrades.Allegro".to_string());
        }
        if previous.allegro && !self.allegro {
            issues.push("Upgrades.Allegro cannot be disabled".to_string());
        }
        if previous.brio && !self.brio {
            issues.push("Upgrades.Brio cannot be disabled".to_string());
        }
        issues
    }
}

fn append_gas_power(s: &mut RlpStream, gp: &GasPowerRules) {
    s.begin_list(5);
    s.append(&gp.alloc_per_sec);
    s.append(&gp.max_alloc_period);
    s.append(&gp.startup_alloc_period);
    s.append(&gp.min_startup_gas);
    s.append(&gp.min_ensured_alloc);
}

fn decode_gas_power(rlp: &Rlp) -> Result<GasPowerRules, DecoderError> {
    expect_list_len(rlp, 5)?;
    Ok(GasPowerRules {
        alloc_per_sec: rlp.val_at(0)?,
        max_alloc_period: rlp.val_at(1)?,
        startup_alloc_period: rlp.val_at(2)?,
        min_startup_gas: rlp.val_at(3)?,
        min_ensured_alloc: rlp.val_at(4)?,
    })
}

fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                match base_map.get_mut(&k) {
                    Some(existing) => merge_json(existing, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_version_follows_block_formation() {
        assert_eq!(Upgrades::sonic().expected_event_version(), crate::event::EVENT_VERSION_2);
        assert_eq!(Upgrades::allegro().expected_event_version(), crate::event::EVENT_VERSION_2);
        assert_eq!(
            Upgrades::single_proposer().expected_event_version(),
            crate::event::EVENT_VERSION_3
        );
    }

    #[test]
    fn test_fake_net_rules_are_valid() {
        let rules = Rules::fake_net();
        assert!(rules.validate(&rules).is_ok());
    }

    #[test]
    fn test_versioned_roundtrip() {
        let rules = Rules::fake_net().with_upgrades(Upgrades::brio());
        let decoded = Rules::from_bytes(&rules.to_bytes()).unwrap();
        assert_eq!(decoded, rules);
    }

    #[test]
    fn test_version_zero_drops_allegro_flags() {
        let rules = Rules::fake_net().with_upgrades(Upgrades::allegro());
        let bytes = rules.to_bytes_version(0);
        let decoded = Rules::from_bytes(&bytes).unwrap();
        assert!(decoded.upgrades.sonic);
        assert!(!decoded.upgrades.allegro);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = Rules::fake_net().to_bytes();
        bytes[0] = RULES_VERSION + 1;
        assert_eq!(
            Rules::from_bytes(&bytes),
            Err(TypesError::UnsupportedRulesVersion(RULES_VERSION + 1))
        );
    }

    #[test]
    fn test_json_update_overrides_nested_field() {
        let rules = Rules::fake_net();
        let updated = rules
            .apply_json_update(br#"{"Blocks":{"MaxBlockGas":6000000000}}"#)
            .unwrap();
        assert_eq!(updated.blocks.max_block_gas, 6_000_000_000);
        assert_eq!(
            updated.blocks.max_empty_block_skip_period,
            rules.blocks.max_empty_block_skip_period
        );
    }

    #[test]
    fn test_json_update_with_upgrade_flag() {
        let rules = Rules::fake_net();
        let updated = rules
            .apply_json_update(br#"{"Upgrades":{"Allegro":true}}"#)
            .unwrap();
        assert!(updated.upgrades.allegro);
        assert!(updated.upgrades.sonic);
    }

    #[test]
    fn test_validation_collects_every_issue() {
        let prev = Rules::fake_net();
        let mut next = prev.clone();
        next.blocks.max_block_gas = 1_000;
        next.economy.min_base_fee = U256::from(2_000u64) * U256::from(GWEI);
        next.upgrades.brio = true;

        let err = next.validate(&prev).unwrap_err();
        assert!(err.len() >= 3);
        let line = err.to_string();
        assert!(line.contains("MaxBlockGas is too low"));
        assert!(line.contains("MinBaseFee is too high"));
        assert!(line.contains("Brio requires"));
    }

    #[test]
    fn test_max_block_gas_upper_bound() {
        let prev = Rules::fake_net();
        let mut next = prev.clone();
        next.blocks.max_block_gas = u64::MAX;
        next.epochs.max_epoch_gas = u64::MAX;
        let err = next.validate(&prev).unwrap_err();
        assert!(err.to_string().contains("MaxBlockGas is too high"));
    }

    #[test]
    fn test_upgrade_cannot_be_reverted() {
        let prev = Rules::fake_net().with_upgrades(Upgrades::allegro());
        let next = prev.clone().with_upgrades(Upgrades::sonic());
        assert!(next.validate(&prev).is_err());
    }

    #[test]
    fn test_expected_event_version() {
        assert_eq!(Upgrades::sonic().expected_event_version(), 2);
        assert_eq!(Upgrades::allegro().expected_event_version(), 2);
        assert_eq!(Upgrades::single_proposer().expected_event_version(), 3);
    }
}
