//! Last event emitted by this process, kept across restarts.
//!
//! Written after the event is connected and before it is broadcast, so a
//! crash can lose at most an event nobody else has seen yet.

use crate::error::{EmitterError, Result};
use shared_crypto::write_atomic;
use shared_types::{EventId, Hash};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory below the data directory holding emitter files.
pub const EMITTER_DIR: &str = "emitter";

/// File name of the last emitted event id.
pub const PREV_EMITTED_FILE: &str = "last";

/// The prev-emitted record.
#[derive(Debug)]
pub struct PrevEmitted {
    path: Option<PathBuf>,
    last: Option<EventId>,
}

impl PrevEmitted {
    /// Record stored below `data_dir`; a missing file yields an empty
    /// record.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(EMITTER_DIR).join(PREV_EMITTED_FILE);
        let last = match fs::read_to_string(&path) {
            Ok(text) => Some(parse(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            last,
        })
    }

    /// Record kept in memory only.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            last: None,
        }
    }

    /// Last emitted event, if known.
    pub fn get(&self) -> Option<EventId> {
        self.last
    }

    /// Persist `id` as the last emitted event.
    pub fn store(&mut self, id: EventId) -> Result<()> {
        if let Some(path) = &self.path {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            write_atomic(path, hex::encode(id.as_bytes()).as_bytes())?;
        }
        self.last = Some(id);
        Ok(())
    }
}

fn parse(text: &str) -> Result<EventId> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| EmitterError::CorruptPrevEmitted(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(EmitterError::CorruptPrevEmitted(format!(
            "{} bytes",
            bytes.len()
        )));
    }
    Ok(EventId(Hash::from_slice(&bytes)))
}
