//! Epoch database producers.

use super::{FileStore, MemoryStore};
use crate::domain::epoch_store::EpochDbProducer;
use crate::error::Result;
use crate::ports::KeyValueStore;
use shared_types::Epoch;
use std::path::PathBuf;
use std::sync::Arc;

/// Fresh in-memory database per epoch.
#[derive(Debug, Default)]
pub struct MemoryProducer;

impl EpochDbProducer for MemoryProducer {
    fn open(&self, _epoch: Epoch) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(MemoryStore::new()))
    }

    fn destroy(&self, _epoch: Epoch) -> Result<()> {
        Ok(())
    }
}

/// One [`FileStore`] directory per epoch under `base`.
#[derive(Debug, Clone)]
pub struct FileProducer {
    base: PathBuf,
    sync_writes: bool,
}

impl FileProducer {
    /// Producer rooted at `base`.
    pub fn new(base: impl Into<PathBuf>, sync_writes: bool) -> Self {
        Self {
            base: base.into(),
            sync_writes,
        }
    }

    fn dir(&self, epoch: Epoch) -> PathBuf {
        self.base.join(format!("epoch-{epoch}"))
    }
}

impl EpochDbProducer for FileProducer {
    fn open(&self, epoch: Epoch) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(FileStore::open(self.dir(epoch), self.sync_writes)?))
    }

    fn destroy(&self, epoch: Epoch) -> Result<()> {
        let dir = self.dir(epoch);
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
