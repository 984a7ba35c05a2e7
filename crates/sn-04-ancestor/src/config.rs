//! Configuration for ancestor indexing.

use serde::Deserialize;

/// Ancestor index configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AncestorConfig {
    /// Events remembered by the payload indexer.
    pub payload_cache_size: usize,
}

impl Default for AncestorConfig {
    fn default() -> Self {
        Self {
            payload_cache_size: 5_000,
        }
    }
}
