//! # Fake Net Genesis
//!
//! Every node of a fake net derives the same validator keys from their ids,
//! so a genesis can be rebuilt anywhere from the config alone.

use crate::config::FakeNetConfig;
use crate::error::Result;
use shared_crypto::{CryptoError, Secp256k1KeyPair};
use shared_types::{
    keccak256_concat, Address, Block, Rules, UnixNanos, ValidatorId, ValidatorProfile,
    ValidatorProfiles, U256,
};
use sn_08_block_processor::{apply_genesis, StateReader, TransferEvm};
use sn_09_store::Store;
use tracing::info;

/// Stake of every fake validator.
pub const FAKE_WEIGHT: u64 = 1_000;

/// Deterministic key of fake validator `id`.
pub fn fake_key(id: ValidatorId) -> std::result::Result<Secp256k1KeyPair, CryptoError> {
    let secret = keccak256_concat(&[b"sonic-fakenet", &id.to_be_bytes()]);
    Secp256k1KeyPair::from_bytes(secret.to_fixed_bytes())
}

/// Genesis contents of a fake net.
#[derive(Debug, Clone)]
pub struct FakeGenesis {
    /// Validator profiles.
    pub profiles: ValidatorProfiles,
    /// Funded accounts.
    pub alloc: Vec<(Address, U256)>,
    /// Network rules.
    pub rules: Rules,
    /// Genesis block time.
    pub time: UnixNanos,
}

impl FakeGenesis {
    /// Genesis for `config`; `now` stands in for an unset genesis time.
    pub fn new(config: &FakeNetConfig, now: UnixNanos) -> Result<Self> {
        let balance = U256::from(config.balance) * U256::exp10(18);
        let mut profiles = ValidatorProfiles::new();
        let mut alloc = Vec::new();
        for id in 1..=config.validators {
            let key = fake_key(id)?;
            profiles.insert(
                id,
                ValidatorProfile {
                    weight: U256::from(FAKE_WEIGHT),
                    pubkey: key.validator_pubkey().as_bytes().to_vec(),
                },
            );
            alloc.push((key.address(), balance));
        }
        Ok(Self {
            profiles,
            alloc,
            rules: config.rules(),
            time: config.genesis_time(now),
        })
    }

    /// Owner of the driver contract: the first validator's account.
    pub fn driver_owner(&self) -> Option<Address> {
        self.alloc.first().map(|(address, _)| *address)
    }

    /// World state funded by the genesis.
    pub fn evm(&self) -> TransferEvm {
        TransferEvm::new(self.alloc.iter().copied(), self.driver_owner())
    }

    /// Write block 0 unless `store` already holds a chain.
    pub fn apply(&self, store: &Store, evm: &TransferEvm) -> Result<Option<Block>> {
        if store.is_initialized()? {
            info!(
                head = store.block_state().last_block.idx,
                epoch = store.epoch_state().epoch,
                "[node] 📂 Existing chain opened"
            );
            return Ok(None);
        }
        let block = apply_genesis(
            store,
            evm.state_root(),
            self.profiles.clone(),
            self.rules.clone(),
            self.time,
        )?;
        info!(
            validators = self.profiles.len(),
            upgrades = ?self.rules.upgrades,
            "[node] 🌱 Fake net genesis written"
        );
        Ok(Some(block))
    }
}
