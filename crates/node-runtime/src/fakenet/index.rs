//! # Epoch Event Index
//!
//! Connected events of the current epoch: persisted in the epoch store and
//! cached decoded in memory, with the latest event of every creator. The
//! cache follows the store's epoch and empties when the epoch is sealed.

use parking_lot::RwLock;
use shared_types::{
    BlockNumber, Epoch, EpochState, EventId, EventPayload, Hash, ValidatorId,
};
use sn_03_event_check::Reader;
use sn_09_store::{Result, Store};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct EpochEvents {
    epoch: Epoch,
    by_id: HashMap<EventId, Arc<EventPayload>>,
    heads: BTreeMap<ValidatorId, Arc<EventPayload>>,
}

impl EpochEvents {
    fn add(&mut self, event: Arc<EventPayload>) {
        let replace = self
            .heads
            .get(&event.creator())
            .map_or(true, |head| event.seq() > head.seq());
        if replace {
            self.heads.insert(event.creator(), Arc::clone(&event));
        }
        self.by_id.insert(event.id(), event);
    }
}

/// Events of the current epoch.
pub struct EventIndex {
    store: Arc<Store>,
    cache: RwLock<EpochEvents>,
}

impl EventIndex {
    /// Empty index over `store`. Call [`EventIndex::load`] to pick up stored
    /// events.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            cache: RwLock::new(EpochEvents {
                epoch: store.epoch_state().epoch,
                ..Default::default()
            }),
            store,
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Read every stored event of the current epoch into the cache. Returns
    /// them in lamport order.
    pub fn load(&self) -> Result<Vec<Arc<EventPayload>>> {
        let events: Vec<Arc<EventPayload>> =
            self.store.events()?.into_iter().map(Arc::new).collect();
        let mut cache = self.cache.write();
        *cache = EpochEvents {
            epoch: self.store.epoch_state().epoch,
            ..Default::default()
        };
        for event in &events {
            cache.add(Arc::clone(event));
        }
        debug!(epoch = cache.epoch, events = events.len(), "[node] Epoch events loaded");
        Ok(events)
    }

    /// Persist and index `event`.
    pub fn insert(&self, event: Arc<EventPayload>) -> Result<()> {
        self.store.set_event(&event)?;
        let mut cache = self.cache.write();
        self.follow_epoch(&mut cache);
        cache.add(event);
        Ok(())
    }

    /// Latest event of `creator` in the current epoch.
    pub fn last_event(&self, creator: ValidatorId) -> Option<Arc<EventPayload>> {
        self.sync_epoch();
        self.cache.read().heads.get(&creator).cloned()
    }

    /// Cached events of the current epoch.
    pub fn len(&self) -> usize {
        self.sync_epoch();
        self.cache.read().by_id.len()
    }

    /// True if the current epoch has no events yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sync_epoch(&self) {
        if self.cache.read().epoch != self.store.epoch_state().epoch {
            let mut cache = self.cache.write();
            self.follow_epoch(&mut cache);
        }
    }

    fn follow_epoch(&self, cache: &mut EpochEvents) {
        let epoch = self.store.epoch_state().epoch;
        if cache.epoch != epoch {
            debug!(from = cache.epoch, to = epoch, "[node] Event index switched epoch");
            *cache = EpochEvents {
                epoch,
                ..Default::default()
            };
        }
    }
}

impl Reader for EventIndex {
    fn epoch_state(&self) -> Arc<EpochState> {
        self.store.epoch_state()
    }

    fn event(&self, id: &EventId) -> Option<Arc<EventPayload>> {
        self.sync_epoch();
        if let Some(event) = self.cache.read().by_id.get(id) {
            return Some(Arc::clone(event));
        }
        self.store.event(id).ok().flatten().map(Arc::new)
    }

    fn block_hash(&self, number: BlockNumber) -> Option<Hash> {
        self.store.block_hash(number).ok().flatten()
    }
}
