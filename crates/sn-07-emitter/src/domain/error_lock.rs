//! # Error Lock
//!
//! Once a permanent error happens the node must not make progress until an
//! operator looks at it. The reason is written to `errlock` in the data
//! directory; while that file exists every start refuses.

use crate::error::{EmitterError, Result};
use parking_lot::Mutex;
use shared_crypto::write_atomic;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::error;

/// File name of the lock inside the data directory.
pub const ERROR_LOCK_FILE: &str = "errlock";

/// Persistent refusal state.
#[derive(Debug)]
pub struct ErrorLock {
    path: Option<PathBuf>,
    reason: Mutex<Option<String>>,
}

impl ErrorLock {
    /// Lock stored in `data_dir`. Fails with [`EmitterError::Locked`] if a
    /// previous run left a lock behind.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(ERROR_LOCK_FILE);
        match fs::read_to_string(&path) {
            Ok(reason) => return Err(EmitterError::Locked(reason.trim().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Self {
            path: Some(path),
            reason: Mutex::new(None),
        })
    }

    /// Lock kept in memory only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            reason: Mutex::new(None),
        }
    }

    /// Fail if the node is locked.
    pub fn check(&self) -> Result<()> {
        match self.reason.lock().as_ref() {
            Some(reason) => Err(EmitterError::Locked(reason.clone())),
            None => Ok(()),
        }
    }

    /// True once a permanent error was recorded.
    pub fn is_locked(&self) -> bool {
        self.reason.lock().is_some()
    }

    /// Record `err` and refuse from now on. The first reason wins.
    pub fn permanent(&self, err: &EmitterError) {
        let mut reason = self.reason.lock();
        if reason.is_some() {
            return;
        }
        let text = err.to_string();
        error!(error = %text, "[sn-07] 🛑 Permanent error, node locked");
        if let Some(path) = &self.path {
            let written = path
                .parent()
                .map_or(Ok(()), |dir| fs::create_dir_all(dir))
                .and_then(|_| write_atomic(path, text.as_bytes()));
            if let Err(e) = written {
                error!(path = %path.display(), error = %e, "[sn-07] ❌ Failed to persist error lock");
            }
        }
        *reason = Some(text);
    }
}
