//! Configuration of the pool and the selector.

use serde::Deserialize;
use std::time::Duration;

/// Pool and selector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Maximum transactions held.
    pub capacity: usize,
    /// Maximum transactions per sender.
    pub max_per_account: usize,
    /// Minimum price increase of a same-nonce replacement, in percent.
    pub replace_bump_percent: u64,
    /// Time reserved for block assembly after selection stops.
    #[serde(deserialize_with = "millis::deserialize")]
    pub deadline_slack: Duration,
    /// Upper bound for one selection run.
    #[serde(deserialize_with = "millis::deserialize")]
    pub max_selection_time: Duration,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            capacity: 16_384,
            max_per_account: 64,
            replace_bump_percent: 10,
            deadline_slack: Duration::from_millis(20),
            max_selection_time: Duration::from_millis(250),
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
