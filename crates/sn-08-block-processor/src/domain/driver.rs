//! # Driver Contract Interface
//!
//! The driver contract is how on-chain governance reaches consensus. Its
//! owner calls it, the call emits a log, and block assembly folds the log
//! into the block state:
//!
//! ```text
//! updateNetworkRules(bytes)              ─► UpdateNetworkRules(bytes)
//! updateValidatorWeight(uint256,uint256) ─► UpdateValidatorWeight(uint256 indexed,uint256)
//! updateValidatorPubkey(uint256,bytes)   ─► UpdateValidatorPubkey(uint256 indexed,bytes)
//! advanceEpochs(uint256)                 ─► AdvanceEpochs(uint256)
//! sealEpoch(uint256)                     (internal only, no log)
//! ```
//!
//! Arguments use the contract ABI: 32-byte words, dynamic `bytes` as
//! offset, length and zero-padded data.

use shared_types::{
    keccak256, Address, BlockState, EpochState, Hash, Log, Rules, ValidatorId, U256,
};
use tracing::{debug, info, warn};

/// Address of the driver contract.
pub const DRIVER_ADDRESS: Address = Address::repeat_byte(0xd1);

/// Sender of internal transactions.
pub const INTERNAL_SENDER: Address = Address::zero();

/// Upper bound on pending epoch advances.
pub const MAX_ADVANCE_EPOCHS: u32 = 1 << 16;

const WORD: usize = 32;

fn selector(signature: &str) -> [u8; 4] {
    let h = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&h.as_bytes()[..4]);
    out
}

/// Topic of `UpdateNetworkRules(bytes)`.
pub fn update_network_rules_topic() -> Hash {
    keccak256(b"UpdateNetworkRules(bytes)")
}

/// Topic of `UpdateValidatorWeight(uint256,uint256)`.
pub fn update_validator_weight_topic() -> Hash {
    keccak256(b"UpdateValidatorWeight(uint256,uint256)")
}

/// Topic of `UpdateValidatorPubkey(uint256,bytes)`.
pub fn update_validator_pubkey_topic() -> Hash {
    keccak256(b"UpdateValidatorPubkey(uint256,bytes)")
}

/// Topic of `AdvanceEpochs(uint256)`.
pub fn advance_epochs_topic() -> Hash {
    keccak256(b"AdvanceEpochs(uint256)")
}

/// A call into the driver contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// JSON diff applied to the rules at the next epoch.
    UpdateNetworkRules(Vec<u8>),
    /// New stake of a validator; zero removes it.
    UpdateValidatorWeight {
        /// Validator.
        id: ValidatorId,
        /// New stake.
        weight: U256,
    },
    /// New public key of a validator.
    UpdateValidatorPubkey {
        /// Validator.
        id: ValidatorId,
        /// Encoded public key.
        pubkey: Vec<u8>,
    },
    /// Seal this many epochs as soon as possible.
    AdvanceEpochs(u32),
    /// Internal epoch seal marker.
    SealEpoch(u32),
}

impl DriverCall {
    /// ABI calldata.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            DriverCall::UpdateNetworkRules(diff) => {
                out.extend_from_slice(&selector("updateNetworkRules(bytes)"));
                out.extend_from_slice(&encode_bytes(diff));
            }
            DriverCall::UpdateValidatorWeight { id, weight } => {
                out.extend_from_slice(&selector("updateValidatorWeight(uint256,uint256)"));
                out.extend_from_slice(&word_u64(u64::from(*id)));
                out.extend_from_slice(&word(*weight));
            }
            DriverCall::UpdateValidatorPubkey { id, pubkey } => {
                out.extend_from_slice(&selector("updateValidatorPubkey(uint256,bytes)"));
                out.extend_from_slice(&word_u64(u64::from(*id)));
                // Offset of the dynamic argument after the static head.
                out.extend_from_slice(&word_u64(2 * WORD as u64));
                out.extend_from_slice(&encode_bytes(pubkey)[WORD..]);
            }
            DriverCall::AdvanceEpochs(n) => {
                out.extend_from_slice(&selector("advanceEpochs(uint256)"));
                out.extend_from_slice(&word_u64(u64::from(*n)));
            }
            DriverCall::SealEpoch(epoch) => {
                out.extend_from_slice(&selector("sealEpoch(uint256)"));
                out.extend_from_slice(&word_u64(u64::from(*epoch)));
            }
        }
        out
    }

    /// Parse calldata; `None` for unknown selectors or malformed arguments.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        let (sel, args) = data.split_at(4);
        if sel == selector("updateNetworkRules(bytes)") {
            Some(DriverCall::UpdateNetworkRules(decode_bytes(args, 0)?))
        } else if sel == selector("updateValidatorWeight(uint256,uint256)") {
            Some(DriverCall::UpdateValidatorWeight {
                id: read_u32(args, 0)?,
                weight: read_word(args, 1)?,
            })
        } else if sel == selector("updateValidatorPubkey(uint256,bytes)") {
            Some(DriverCall::UpdateValidatorPubkey {
                id: read_u32(args, 0)?,
                pubkey: decode_bytes(args, 1)?,
            })
        } else if sel == selector("advanceEpochs(uint256)") {
            Some(DriverCall::AdvanceEpochs(read_u32(args, 0)?))
        } else if sel == selector("sealEpoch(uint256)") {
            Some(DriverCall::SealEpoch(read_u32(args, 0)?))
        } else {
            None
        }
    }

    /// True for calls only the node itself may make.
    pub fn is_internal_only(&self) -> bool {
        matches!(self, DriverCall::SealEpoch(_))
    }

    /// Log the driver emits for this call.
    pub fn to_log(&self) -> Option<Log> {
        let (topics, data) = match self {
            DriverCall::UpdateNetworkRules(diff) => {
                (vec![update_network_rules_topic()], encode_bytes(diff))
            }
            DriverCall::UpdateValidatorWeight { id, weight } => (
                vec![update_validator_weight_topic(), id_topic(*id)],
                word(*weight).to_vec(),
            ),
            DriverCall::UpdateValidatorPubkey { id, pubkey } => (
                vec![update_validator_pubkey_topic(), id_topic(*id)],
                encode_bytes(pubkey),
            ),
            DriverCall::AdvanceEpochs(n) => {
                (vec![advance_epochs_topic()], word_u64(u64::from(*n)).to_vec())
            }
            DriverCall::SealEpoch(_) => return None,
        };
        Some(Log {
            address: DRIVER_ADDRESS,
            topics,
            data,
            ..Default::default()
        })
    }
}

/// A driver log understood by block assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverLog {
    /// Rules diff.
    UpdateNetworkRules(Vec<u8>),
    /// Stake change.
    UpdateValidatorWeight(ValidatorId, U256),
    /// Key change.
    UpdateValidatorPubkey(ValidatorId, Vec<u8>),
    /// Epoch advance request.
    AdvanceEpochs(u32),
}

impl DriverLog {
    /// Parse `log`; `None` if it is not a driver log.
    pub fn parse(log: &Log) -> Option<Self> {
        if log.address != DRIVER_ADDRESS {
            return None;
        }
        let topic = log.topics.first()?;
        if *topic == update_network_rules_topic() {
            Some(DriverLog::UpdateNetworkRules(decode_bytes(&log.data, 0)?))
        } else if *topic == update_validator_weight_topic() {
            Some(DriverLog::UpdateValidatorWeight(
                topic_u32(log.topics.get(1)?)?,
                read_word(&log.data, 0)?,
            ))
        } else if *topic == update_validator_pubkey_topic() {
            Some(DriverLog::UpdateValidatorPubkey(
                topic_u32(log.topics.get(1)?)?,
                decode_bytes(&log.data, 0)?,
            ))
        } else if *topic == advance_epochs_topic() {
            Some(DriverLog::AdvanceEpochs(read_u32(&log.data, 0)?))
        } else {
            None
        }
    }
}

/// Fold driver logs into the block state. Returns the number applied.
///
/// Rule diffs stack on top of pending ones and must validate against the
/// rules of the current epoch; a rejected diff leaves the pending rules
/// untouched.
pub fn apply_driver_logs(logs: &[Log], bs: &mut BlockState, es: &EpochState) -> usize {
    let mut applied = 0;
    for log in logs {
        let Some(parsed) = DriverLog::parse(log) else {
            continue;
        };
        match parsed {
            DriverLog::UpdateNetworkRules(diff) => {
                let base = bs.dirty_rules.clone().unwrap_or_else(|| es.rules.clone());
                match update_rules(&base, &diff, &es.rules) {
                    Ok(rules) => {
                        info!(
                            epoch = es.epoch,
                            upgrades = ?rules.upgrades,
                            "[sn-08] 📜 Network rules update scheduled"
                        );
                        bs.dirty_rules = Some(rules);
                        applied += 1;
                    }
                    Err(reason) => {
                        warn!(
                            tx = ?log.tx_hash,
                            error = %reason,
                            "[sn-08] ⚠️ Network rules update rejected"
                        );
                    }
                }
            }
            DriverLog::UpdateValidatorWeight(id, weight) => {
                let profiles = next_profiles(bs, es);
                if weight.is_zero() {
                    profiles.remove(&id);
                } else {
                    profiles.entry(id).or_default().weight = weight;
                }
                debug!(validator = id, %weight, "[sn-08] ⚖️ Validator weight updated");
                applied += 1;
            }
            DriverLog::UpdateValidatorPubkey(id, pubkey) => {
                next_profiles(bs, es).entry(id).or_default().pubkey = pubkey;
                debug!(validator = id, "[sn-08] 🔑 Validator key updated");
                applied += 1;
            }
            DriverLog::AdvanceEpochs(n) => {
                bs.advance_epochs = bs.advance_epochs.saturating_add(n).min(MAX_ADVANCE_EPOCHS);
                debug!(pending = bs.advance_epochs, "[sn-08] ⏩ Epoch advance requested");
                applied += 1;
            }
        }
    }
    applied
}

fn update_rules(base: &Rules, diff: &[u8], current: &Rules) -> Result<Rules, String> {
    let updated = base.apply_json_update(diff).map_err(|e| e.to_string())?;
    updated.validate(current).map_err(|e| e.to_string())?;
    Ok(updated)
}

fn next_profiles<'a>(
    bs: &'a mut BlockState,
    es: &EpochState,
) -> &'a mut shared_types::ValidatorProfiles {
    if bs.next_validator_profiles.is_empty() {
        bs.next_validator_profiles = es.validator_profiles.clone();
    }
    &mut bs.next_validator_profiles
}

// =============================================================================
// ABI helpers
// =============================================================================

fn word(v: U256) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    v.to_big_endian(&mut out);
    out
}

fn word_u64(v: u64) -> [u8; WORD] {
    word(U256::from(v))
}

fn id_topic(id: ValidatorId) -> Hash {
    Hash::from(word_u64(u64::from(id)))
}

fn topic_u32(topic: &Hash) -> Option<u32> {
    u32::try_from(U256::from_big_endian(topic.as_bytes())).ok()
}

fn read_word(data: &[u8], index: usize) -> Option<U256> {
    let start = index.checked_mul(WORD)?;
    let bytes = data.get(start..start.checked_add(WORD)?)?;
    Some(U256::from_big_endian(bytes))
}

fn read_u32(data: &[u8], index: usize) -> Option<u32> {
    u32::try_from(read_word(data, index)?).ok()
}

fn read_usize(data: &[u8], index: usize) -> Option<usize> {
    usize::try_from(read_word(data, index)?).ok()
}

/// `offset ‖ length ‖ padded data` for a lone `bytes` argument.
fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let padded = data.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(2 * WORD + padded);
    out.extend_from_slice(&word_u64(WORD as u64));
    out.extend_from_slice(&word_u64(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(2 * WORD + padded, 0);
    out
}

/// Decode the `bytes` argument whose offset sits in head word `index`.
fn decode_bytes(args: &[u8], index: usize) -> Option<Vec<u8>> {
    let offset = read_usize(args, index)?;
    let len_bytes = args.get(offset..offset.checked_add(WORD)?)?;
    let len = usize::try_from(U256::from_big_endian(len_bytes)).ok()?;
    let start = offset + WORD;
    args.get(start..start.checked_add(len)?).map(<[u8]>::to_vec)
}
