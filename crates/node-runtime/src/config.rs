//! # Node Configuration
//!
//! One TOML file configures every subsystem. Missing sections and fields keep
//! their defaults, so an empty file starts a solo fake net in memory.
//!
//! ```toml
//! validator_id = 1
//! data_dir = "/var/lib/sonic"
//!
//! [log]
//! level = "debug"
//!
//! [emitter.intervals]
//! max = 2000
//! ```
//!
//! Environment overrides applied after the file: `SONIC_DATA_DIR`,
//! `SONIC_LOG_LEVEL`, `SONIC_VALIDATOR_ID`.

use serde::Deserialize;
use shared_types::{Rules, Upgrades, ValidatorId, NANOS_PER_SEC};
use sn_03_event_check::HeavyCheckConfig;
use sn_06_tx_selector::SelectorConfig;
use sn_07_emitter::EmitterConfig;
use sn_08_block_processor::BlockProcessorConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the data directory.
pub const ENV_DATA_DIR: &str = "SONIC_DATA_DIR";
/// Overrides the log level.
pub const ENV_LOG_LEVEL: &str = "SONIC_LOG_LEVEL";
/// Overrides the validator id.
pub const ENV_VALIDATOR_ID: &str = "SONIC_VALIDATOR_ID";

/// Complete node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Validator this node emits for; zero runs a non-validator.
    pub validator_id: ValidatorId,
    /// Root of all node files; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Sync every store write to disk.
    pub sync_writes: bool,
    /// Logging.
    pub log: LogConfig,
    /// Genesis of the local network.
    pub fakenet: FakeNetConfig,
    /// Event emission.
    pub emitter: EmitterConfig,
    /// Transaction pool and proposal selection.
    pub selector: SelectorConfig,
    /// Signature checks.
    pub heavy_check: HeavyCheckConfig,
    /// Block assembly.
    pub block_processor: BlockProcessorConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            validator_id: 1,
            data_dir: None,
            sync_writes: false,
            log: LogConfig::default(),
            fakenet: FakeNetConfig::default(),
            emitter: EmitterConfig::fake_net(1),
            selector: SelectorConfig::default(),
            heavy_check: HeavyCheckConfig::default(),
            block_processor: BlockProcessorConfig::default(),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// One JSON object per line instead of text.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Network upgrades active from genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeSet {
    /// Version-2 events, blocks from event transactions.
    #[default]
    Sonic,
    /// Sonic plus the Allegro fixes.
    Allegro,
    /// Allegro plus the block size cap.
    Brio,
    /// Version-3 events, one proposer per block.
    SingleProposer,
}

impl UpgradeSet {
    /// The upgrade flags.
    pub fn upgrades(self) -> Upgrades {
        match self {
            UpgradeSet::Sonic => Upgrades::sonic(),
            UpgradeSet::Allegro => Upgrades::allegro(),
            UpgradeSet::Brio => Upgrades::brio(),
            UpgradeSet::SingleProposer => Upgrades::single_proposer(),
        }
    }
}

/// Genesis of the local network.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FakeNetConfig {
    /// Validators in the genesis set, ids `1..=validators`.
    pub validators: u32,
    /// Upgrades active from block 0.
    pub upgrades: UpgradeSet,
    /// Balance of every validator account, in whole tokens.
    pub balance: u64,
    /// Genesis time in seconds since the Unix epoch; `None` uses the start
    /// time of the first run.
    pub genesis_time: Option<u64>,
}

impl Default for FakeNetConfig {
    fn default() -> Self {
        Self {
            validators: 1,
            upgrades: UpgradeSet::default(),
            balance: 1_000_000_000,
            genesis_time: None,
        }
    }
}

impl FakeNetConfig {
    /// Network rules of the fake net.
    pub fn rules(&self) -> Rules {
        Rules::fake_net().with_upgrades(self.upgrades.upgrades())
    }

    /// Genesis time in nanoseconds, `now` if unset.
    pub fn genesis_time(&self, now: u64) -> u64 {
        self.genesis_time.map_or(now, |s| s.saturating_mul(NANOS_PER_SEC))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Cause.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`NodeConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override does not parse.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// The genesis set is empty.
    #[error("fake net needs at least one validator")]
    NoValidators,

    /// The validator id is outside the genesis set.
    #[error("validator {id} is not in the genesis set 1..={validators}")]
    UnknownValidator {
        /// Configured id.
        id: ValidatorId,
        /// Genesis set size.
        validators: u32,
    },

    /// A solo node has no peers, so protected emission would never start.
    #[error("doublesign protection needs peers; set emitter.intervals.doublesign_protection = 0")]
    ProtectionWithoutPeers,

    /// The heavy-check queue cannot hold a single event.
    #[error("heavy_check.queue_size must be positive")]
    EmptyQueue,
}

impl NodeConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path`, or start from the defaults when `path` is `None`, then
    /// apply the environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log.level = level;
        }
        if let Some(value) = lookup(ENV_VALIDATOR_ID) {
            self.validator_id = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_VALIDATOR_ID,
                value,
            })?;
        }
        Ok(())
    }

    /// Check the configuration before start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let validators = self.fakenet.validators;
        if validators == 0 {
            return Err(ConfigError::NoValidators);
        }
        if self.validator_id > validators {
            return Err(ConfigError::UnknownValidator {
                id: self.validator_id,
                validators,
            });
        }
        if !self.emitter.intervals.doublesign_protection.is_zero() {
            return Err(ConfigError::ProtectionWithoutPeers);
        }
        if self.heavy_check.queue_size == 0 {
            return Err(ConfigError::EmptyQueue);
        }
        Ok(())
    }

    /// Emitter settings with the node-level validator id and data directory.
    pub fn emitter_config(&self) -> EmitterConfig {
        EmitterConfig {
            validator: self.validator_id,
            data_dir: self.data_dir.as_ref().map(|d| d.join("emitter")),
            ..self.emitter.clone()
        }
    }
}
