//! # Solo World
//!
//! The emitter's view of a node that is alone on its network. Own events are
//! checked like any received event, stored, announced to the emitter and
//! then committed by the solo consensus.

use super::consensus::SoloConsensus;
use super::index::EventIndex;
use parking_lot::RwLock;
use shared_types::{ChainConfig, EpochState, EventId, EventPayload, ValidatorId};
use sn_03_event_check::{Checkers, Reader};
use sn_06_tx_selector::TxRunner;
use sn_07_emitter::{
    Emitter, EmitterError, ErrorLock, EvmTxRunner, LatestBlock, Result, World,
};
use sn_08_block_processor::{ConfirmedEventListener, Evm, EvmBlockContext, TransferEvm};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Node services for the emitter of a solo node.
pub struct SoloWorld {
    index: Arc<EventIndex>,
    checkers: Checkers,
    consensus: SoloConsensus,
    evm: Arc<TransferEvm>,
    error_lock: Arc<ErrorLock>,
    emitter: RwLock<Option<Weak<Emitter>>>,
    broadcasts: AtomicU64,
}

impl SoloWorld {
    /// World over `index`, checking with `checkers` and committing through
    /// `consensus`.
    pub fn new(
        index: Arc<EventIndex>,
        checkers: Checkers,
        consensus: SoloConsensus,
        evm: Arc<TransferEvm>,
        error_lock: Arc<ErrorLock>,
    ) -> Self {
        Self {
            index,
            checkers,
            consensus,
            evm,
            error_lock,
            emitter: RwLock::new(None),
            broadcasts: AtomicU64::new(0),
        }
    }

    /// Route connected events to `emitter`.
    pub fn attach(&self, emitter: &Arc<Emitter>) {
        *self.emitter.write() = Some(Arc::downgrade(emitter));
    }

    /// Consensus committing the events.
    pub fn consensus(&self) -> &SoloConsensus {
        &self.consensus
    }

    /// Event index.
    pub fn index(&self) -> &Arc<EventIndex> {
        &self.index
    }

    /// Events handed to [`World::broadcast`].
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    /// Announce an already stored event to the emitter.
    pub fn replay(&self, event: &EventPayload) {
        if let Some(emitter) = self.attached() {
            emitter.on_event_connected(event);
        }
    }

    fn attached(&self) -> Option<Arc<Emitter>> {
        self.emitter.read().as_ref().and_then(Weak::upgrade)
    }

    fn fail(&self, reason: String) -> EmitterError {
        let err = EmitterError::Process(reason);
        self.error_lock.permanent(&err);
        EmitterError::Locked(err.to_string())
    }
}

impl World for SoloWorld {
    fn epoch_state(&self) -> Arc<EpochState> {
        self.index.epoch_state()
    }

    fn latest_block(&self) -> Option<LatestBlock> {
        let store = self.index.store();
        let number = store.block_state().last_block.idx;
        let block = store.block(number).ok().flatten()?;
        Some(LatestBlock {
            number,
            hash: block.hash,
            time: block.time,
            prev_randao: block.prev_randao,
            base_fee: block.base_fee,
        })
    }

    fn event(&self, id: &EventId) -> Option<Arc<EventPayload>> {
        self.index.event(id)
    }

    fn last_event(&self, creator: ValidatorId) -> Option<Arc<EventPayload>> {
        self.index.last_event(creator)
    }

    fn process(&self, event: EventPayload) -> Result<Arc<EventPayload>> {
        self.checkers.validate_full(&event)?;
        let event = Arc::new(event);
        if let Err(e) = self.index.insert(Arc::clone(&event)) {
            error!(event = ?event.id(), error = %e, "[node] ❌ Event not stored");
            return Err(if e.is_permanent() {
                self.fail(format!("storing event: {e}"))
            } else {
                EmitterError::Process(e.to_string())
            });
        }
        if let Some(emitter) = self.attached() {
            emitter.on_event_connected(&event);
        }
        if let Err(e) = self.consensus.commit(&event) {
            error!(event = ?event.id(), error = %e, "[node] ❌ Consensus block failed");
            return Err(if e.is_permanent() {
                self.fail(format!("block assembly: {e}"))
            } else {
                EmitterError::Process(e.to_string())
            });
        }
        Ok(event)
    }

    fn broadcast(&self, event: &Arc<EventPayload>) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        debug!(event = ?event.id(), "[node] No peers to broadcast to");
    }

    fn peer_count(&self) -> usize {
        0
    }

    fn is_synced(&self) -> bool {
        true
    }

    fn tx_runner(&self, head: &LatestBlock) -> Box<dyn TxRunner + Send> {
        let es = self.index.epoch_state();
        let store = self.index.store();
        let ctx = EvmBlockContext {
            number: head.number + 1,
            time: head.time + 1,
            prev_randao: head.prev_randao,
            base_fee: head.base_fee,
            gas_limit: es.rules.blocks.max_block_gas,
            chain: ChainConfig::materialize(es.rules.network_id, &store.upgrade_heights()),
            rules: es.rules.clone(),
        };
        Box::new(EvmTxRunner::new(self.evm.begin(ctx), self.evm.clone()))
    }
}

/// Forwards confirmations to the emitter without keeping it alive.
pub struct EmitterListener(Weak<Emitter>);

impl EmitterListener {
    /// Listener for `emitter`.
    pub fn new(emitter: &Arc<Emitter>) -> Self {
        Self(Arc::downgrade(emitter))
    }
}

impl ConfirmedEventListener for EmitterListener {
    fn on_event_confirmed(&self, event: &EventPayload) {
        if let Some(emitter) = self.0.upgrade() {
            emitter.on_event_confirmed(event);
        }
    }
}
