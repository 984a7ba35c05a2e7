//! Emitter configuration.

use serde::Deserialize;
use shared_types::ValidatorId;
use sn_04_ancestor::AncestorConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Emission pacing and protection windows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmitIntervals {
    /// Never emit faster than this.
    #[serde(deserialize_with = "millis::deserialize")]
    pub min: Duration,
    /// Emit at least this often, even with nothing to carry.
    #[serde(deserialize_with = "millis::deserialize")]
    pub max: Duration,
    /// Base interval while others' payloads wait for confirmation.
    #[serde(deserialize_with = "millis::deserialize")]
    pub confirming: Duration,
    /// Emission pauses for this long after a recent event of this validator
    /// shows up that this process did not create. Zero disables the sync
    /// checks.
    #[serde(deserialize_with = "millis::deserialize")]
    pub doublesign_protection: Duration,
    /// An external event of this validator younger than this halts the node.
    #[serde(deserialize_with = "millis::deserialize")]
    pub parallel_instance_protection: Duration,
}

impl Default for EmitIntervals {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(150),
            max: Duration::from_secs(600),
            confirming: Duration::from_millis(170),
            doublesign_protection: Duration::from_secs(27 * 60),
            parallel_instance_protection: Duration::from_secs(60),
        }
    }
}

/// Emitter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Validator this node emits for; zero disables emission.
    pub validator: ValidatorId,
    /// Pacing.
    pub intervals: EmitIntervals,
    /// Period of the tick loop.
    #[serde(deserialize_with = "millis::deserialize")]
    pub tick: Duration,
    /// Random extension of every tick, in percent.
    pub tick_jitter_percent: u64,
    /// Transactions per version-2 event.
    pub max_txs_per_event: usize,
    /// A pooled transaction is offered to the next validator after this long.
    #[serde(deserialize_with = "millis::deserialize")]
    pub tx_turn_period: Duration,
    /// First-seen times remembered.
    pub tx_time_cache_size: usize,
    /// Directory of the prev-emitted event file; `None` keeps it in memory.
    pub data_dir: Option<PathBuf>,
    /// Put the node version into the first event after start.
    pub version_extra: bool,
    /// Parent selection.
    pub ancestor: AncestorConfig,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            validator: 0,
            intervals: EmitIntervals::default(),
            tick: Duration::from_millis(11),
            tick_jitter_percent: 10,
            max_txs_per_event: 512,
            tx_turn_period: Duration::from_secs(8),
            tx_time_cache_size: 20_000,
            data_dir: None,
            version_extra: true,
            ancestor: AncestorConfig::default(),
        }
    }
}

impl EmitterConfig {
    /// Settings for a local network: no protection windows, short maximum
    /// interval.
    pub fn fake_net(validator: ValidatorId) -> Self {
        Self {
            validator,
            intervals: EmitIntervals {
                min: Duration::ZERO,
                max: Duration::from_secs(1),
                confirming: Duration::from_millis(100),
                doublesign_protection: Duration::ZERO,
                parallel_instance_protection: Duration::ZERO,
            },
            ..Self::default()
        }
    }

    /// Tick jitter in percent; doublesign protection widens it to a third.
    pub fn jitter_percent(&self) -> u64 {
        if self.intervals.doublesign_protection.is_zero() {
            self.tick_jitter_percent
        } else {
            self.tick_jitter_percent.max(33)
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: EmitterConfig = serde_json::from_str(
            r#"{"validator": 3, "intervals": {"min": 50}, "data_dir": "/tmp/e"}"#,
        )
        .unwrap();
        assert_eq!(cfg.validator, 3);
        assert_eq!(cfg.intervals.min, Duration::from_millis(50));
        assert_eq!(cfg.intervals.max, Duration::from_secs(600));
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/e")));
    }

    #[test]
    fn test_jitter_widened_by_doublesign_protection() {
        assert_eq!(EmitterConfig::default().jitter_percent(), 33);
        assert_eq!(EmitterConfig::fake_net(1).jitter_percent(), 10);
    }
}
