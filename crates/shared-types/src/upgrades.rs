//! # Upgrade History
//!
//! Every epoch whose sealing changes the [`Upgrades`] set appends an
//! [`UpgradeHeight`]. The history is persisted as a single RLP list and is
//! materialized into an EVM fork schedule by [`ChainConfig::materialize`].

use crate::primitives::{expect_list_len, BlockNumber, UnixNanos, NANOS_PER_SEC};
use crate::rules::Upgrades;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Block at which an upgrade set became effective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeHeight {
    /// Active upgrades from `height` on.
    pub upgrades: Upgrades,
    /// First block under these upgrades.
    pub height: BlockNumber,
    /// Time of that block.
    pub time: UnixNanos,
}

impl Encodable for UpgradeHeight {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.upgrades);
        s.append(&self.height);
        s.append(&self.time);
    }
}

impl Decodable for UpgradeHeight {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 3)?;
        Ok(Self {
            upgrades: rlp.val_at(0)?,
            height: rlp.val_at(1)?,
            time: rlp.val_at(2)?,
        })
    }
}

/// Encode a history as one RLP list.
pub fn encode_upgrade_heights(heights: &[UpgradeHeight]) -> Vec<u8> {
    rlp::encode_list::<UpgradeHeight, _>(heights).to_vec()
}

/// Decode a history written by [`encode_upgrade_heights`].
pub fn decode_upgrade_heights(bytes: &[u8]) -> Result<Vec<UpgradeHeight>, DecoderError> {
    Rlp::new(bytes).as_list()
}

/// EVM fork schedule.
///
/// Block-activated forks carry a height; time-activated forks carry a
/// timestamp in seconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id.
    pub chain_id: u64,
    /// Berlin activation block.
    pub berlin_block: Option<BlockNumber>,
    /// London activation block.
    pub london_block: Option<BlockNumber>,
    /// Shanghai activation time.
    pub shanghai_time: Option<u64>,
    /// Cancun activation time.
    pub cancun_time: Option<u64>,
    /// Prague activation time.
    pub prague_time: Option<u64>,
    /// Osaka activation time.
    pub osaka_time: Option<u64>,
}

impl ChainConfig {
    /// Build the fork schedule from an upgrade history ordered by height.
    ///
    /// The first height at which a feature appears wins; later entries never
    /// move an activation.
    pub fn materialize(chain_id: u64, heights: &[UpgradeHeight]) -> Self {
        let mut cfg = ChainConfig {
            chain_id,
            ..Default::default()
        };
        for h in heights {
            let secs = h.time / NANOS_PER_SEC;
            let u = &h.upgrades;
            if u.berlin && cfg.berlin_block.is_none() {
                cfg.berlin_block = Some(h.height);
            }
            if u.london && cfg.london_block.is_none() {
                cfg.london_block = Some(h.height);
            }
            if u.sonic && cfg.shanghai_time.is_none() {
                cfg.shanghai_time = Some(secs);
                cfg.cancun_time = Some(secs);
            }
            if u.allegro && cfg.prague_time.is_none() {
                cfg.prague_time = Some(secs);
            }
            if u.brio && cfg.osaka_time.is_none() {
                cfg.osaka_time = Some(secs);
            }
        }
        cfg
    }

    /// True if Prague rules apply at `time_secs`.
    pub fn is_prague(&self, time_secs: u64) -> bool {
        self.prague_time.is_some_and(|t| time_secs >= t)
    }

    /// True if London rules apply at `number`.
    pub fn is_london(&self, number: BlockNumber) -> bool {
        self.london_block.is_some_and(|b| number >= b)
    }
}
