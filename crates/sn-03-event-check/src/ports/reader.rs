//! # Reader Port
//!
//! Everything a checker may look at besides the event itself. Checkers are
//! pure functions of `(event, reader)`, so an implementation must return a
//! consistent snapshot for the duration of one check.

use shared_types::{BlockNumber, EpochState, EventId, EventPayload, Hash};
use std::sync::Arc;

/// Read access to epoch state, known events and known blocks.
pub trait Reader: Send + Sync {
    /// Current epoch state: validators, keys, rules, epoch start.
    fn epoch_state(&self) -> Arc<EpochState>;

    /// A locally known event.
    fn event(&self, id: &EventId) -> Option<Arc<EventPayload>>;

    /// Hash of a locally known block.
    fn block_hash(&self, number: BlockNumber) -> Option<Hash>;
}
