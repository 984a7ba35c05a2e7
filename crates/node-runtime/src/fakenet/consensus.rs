//! # Solo Consensus
//!
//! With one emitting validator every connected event is final at once: each
//! event becomes the Atropos of its own consensus block, confirming only
//! itself since its ancestors were confirmed before it.

use shared_types::{EventPayload, Validators};
use sn_08_block_processor::{BlockProcessor, ConsensusBlock, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Commits connected events as consensus blocks.
pub struct SoloConsensus {
    processor: Arc<BlockProcessor>,
    committed: AtomicU64,
}

impl SoloConsensus {
    /// Consensus feeding `processor`.
    pub fn new(processor: Arc<BlockProcessor>) -> Self {
        Self {
            processor,
            committed: AtomicU64::new(0),
        }
    }

    /// Block processor fed by this consensus.
    pub fn processor(&self) -> &Arc<BlockProcessor> {
        &self.processor
    }

    /// Consensus blocks committed since start.
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    /// Decide `event` as the Atropos of the next consensus block. Returns the
    /// new validator set when the block sealed the epoch.
    pub fn commit(&self, event: &Arc<EventPayload>) -> Result<Option<Validators>> {
        let mut assembly = self.processor.begin_block(ConsensusBlock {
            atropos: event.id(),
            cheaters: Vec::new(),
        });
        assembly.apply_event(Arc::clone(event));
        let sealed = assembly.end_block()?;
        self.committed.fetch_add(1, Ordering::Relaxed);
        if let Some(validators) = &sealed {
            info!(
                atropos = ?event.id(),
                validators = validators.len(),
                "[node] 🔒 Solo consensus sealed the epoch"
            );
        }
        Ok(sealed)
    }
}
