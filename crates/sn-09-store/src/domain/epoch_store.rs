//! # Epoch Store
//!
//! Data that only matters within one epoch (events, per-epoch indices)
//! lives in its own sub-database. Switching epochs opens a fresh one and
//! drops the old one on a background thread. Readers still holding the old
//! handle get [`StoreError::Closed`](crate::StoreError::Closed) and skip.

use crate::error::Result;
use crate::ports::KeyValueStore;
use parking_lot::RwLock;
use shared_types::Epoch;
use std::sync::Arc;
use tracing::{info, warn};

/// Opens and destroys per-epoch databases.
pub trait EpochDbProducer: Send + Sync {
    /// Open (or create) the database of `epoch`.
    fn open(&self, epoch: Epoch) -> Result<Arc<dyn KeyValueStore>>;

    /// Remove whatever `open(epoch)` left behind.
    fn destroy(&self, epoch: Epoch) -> Result<()>;
}

/// The current epoch's database.
pub struct EpochStore {
    producer: Arc<dyn EpochDbProducer>,
    current: RwLock<(Epoch, Arc<dyn KeyValueStore>)>,
}

impl EpochStore {
    /// Open the database of `epoch`.
    pub fn open(producer: Arc<dyn EpochDbProducer>, epoch: Epoch) -> Result<Self> {
        let db = producer.open(epoch)?;
        Ok(Self {
            producer,
            current: RwLock::new((epoch, db)),
        })
    }

    /// Epoch of the current database.
    pub fn epoch(&self) -> Epoch {
        self.current.read().0
    }

    /// Handle to the current database.
    pub fn db(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.current.read().1)
    }

    /// Switch to `epoch`. A no-op if it is already current.
    pub fn reset(&self, epoch: Epoch) -> Result<()> {
        if self.epoch() == epoch {
            return Ok(());
        }
        let fresh = self.producer.open(epoch)?;
        let (old_epoch, old_db) = std::mem::replace(&mut *self.current.write(), (epoch, fresh));
        info!(from = old_epoch, to = epoch, "[sn-09] 🔄 Epoch store reset");

        let producer = Arc::clone(&self.producer);
        let dropper = move || {
            old_db.close();
            drop(old_db);
            if let Err(e) = producer.destroy(old_epoch) {
                warn!(epoch = old_epoch, error = %e, "[sn-09] ⚠️ Failed to drop epoch store");
            }
        };
        if let Err(e) = std::thread::Builder::new()
            .name(format!("epoch-drop-{old_epoch}"))
            .spawn(dropper)
        {
            warn!(error = %e, "[sn-09] ⚠️ Could not spawn epoch drop thread");
        }
        Ok(())
    }
}
