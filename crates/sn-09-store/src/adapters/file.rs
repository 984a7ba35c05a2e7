//! # File Store
//!
//! Durable store for the fake net and light deployments: an in-memory
//! ordered map backed by an append-only log.
//!
//! ## Log Format
//!
//! ```text
//! frame := [len: u32 LE][crc32(body): u32 LE][body]
//! body  := [count: u32 LE] op*
//! op    := 0x00 [klen u32][key][vlen u32][value]   put
//!        | 0x01 [klen u32][key]                    delete
//! ```
//!
//! One frame per batch, so a batch is applied entirely or not at all. A torn
//! or mismatching final frame is cut off on open; a bad frame followed by
//! more data is corruption.

use crate::error::{Result, StoreError};
use crate::ports::{BatchOperation, KeyValueStore};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

const LOG_FILE: &str = "store.log";
const LOCK_FILE: &str = "LOCK";
const FRAME_HEADER: usize = 8;
const OP_PUT: u8 = 0;
const OP_DELETE: u8 = 1;

/// Overwritten or deleted records tolerated before compaction.
const COMPACT_THRESHOLD: usize = 10_000;

struct Log {
    file: File,
    garbage: usize,
}

/// Log-backed key/value store owning a directory.
pub struct FileStore {
    dir: PathBuf,
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    log: Mutex<Log>,
    _lock: File,
    sync_writes: bool,
    closed: AtomicBool,
}

impl FileStore {
    /// Open or create a store in `dir`, taking an exclusive lock on it.
    pub fn open(dir: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(dir.display().to_string()))?;

        let path = dir.join(LOG_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut data = BTreeMap::new();
        let (valid, garbage) = replay(&bytes, &mut data)?;
        if valid < bytes.len() {
            warn!(
                path = %path.display(),
                dropped = bytes.len() - valid,
                "[sn-09] ⚠️ Truncating torn log tail"
            );
            file.set_len(valid as u64)?;
        }
        info!(path = %path.display(), keys = data.len(), "[sn-09] 💾 Store opened");

        Ok(Self {
            dir,
            data: RwLock::new(data),
            log: Mutex::new(Log { file, garbage }),
            _lock: lock,
            sync_writes,
            closed: AtomicBool::new(false),
        })
    }

    /// Directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rewrite the log with only live pairs.
    pub fn compact(&self) -> Result<()> {
        self.check_open()?;
        let mut log = self.log.lock();
        self.compact_locked(&mut log)
    }

    fn compact_locked(&self, log: &mut Log) -> Result<()> {
        let ops: Vec<BatchOperation> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| BatchOperation::put(k.clone(), v.clone()))
            .collect();
        let tmp = self.dir.join(format!("{LOG_FILE}.tmp"));
        {
            let mut f = File::create(&tmp)?;
            if !ops.is_empty() {
                f.write_all(&encode_frame(&ops))?;
            }
            f.sync_all()?;
        }
        std::fs::rename(&tmp, self.dir.join(LOG_FILE))?;
        log.file = OpenOptions::new()
            .append(true)
            .open(self.dir.join(LOG_FILE))?;
        info!(keys = ops.len(), dropped = log.garbage, "[sn-09] 🧹 Store compacted");
        log.garbage = 0;
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        self.check_open()?;
        if operations.is_empty() {
            return Ok(());
        }
        let mut log = self.log.lock();
        log.file.write_all(&encode_frame(&operations))?;
        if self.sync_writes {
            log.file.sync_data()?;
        }

        let mut data = self.data.write();
        for op in operations {
            let replaced = match op {
                BatchOperation::Put { key, value } => data.insert(key, value).is_some(),
                BatchOperation::Delete { key } => data.remove(&key).is_some(),
            };
            if replaced {
                log.garbage += 1;
            }
        }
        let compact = log.garbage > COMPACT_THRESHOLD && log.garbage > data.len();
        drop(data);
        if compact {
            self.compact_locked(&mut log)?;
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> Result<()> {
        self.check_open()?;
        self.log.lock().file.sync_all()?;
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.log.lock().file.sync_all() {
            warn!(error = %e, "[sn-09] ⚠️ Final sync failed");
        }
    }
}

fn encode_frame(ops: &[BatchOperation]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(ops.len() as u32).to_le_bytes());
    for op in ops {
        match op {
            BatchOperation::Put { key, value } => {
                body.push(OP_PUT);
                put_bytes(&mut body, key);
                put_bytes(&mut body, value);
            }
            BatchOperation::Delete { key } => {
                body.push(OP_DELETE);
                put_bytes(&mut body, key);
            }
        }
    }
    let mut frame = Vec::with_capacity(FRAME_HEADER + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Apply all intact frames; returns the length of the valid prefix and the
/// number of superseded records.
fn replay(bytes: &[u8], data: &mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(usize, usize)> {
    let mut offset = 0;
    let mut garbage = 0;
    while offset + FRAME_HEADER <= bytes.len() {
        let len = read_u32(bytes, offset) as usize;
        let crc = read_u32(bytes, offset + 4);
        let start = offset + FRAME_HEADER;
        let end = start + len;
        if end > bytes.len() {
            break;
        }
        let body = &bytes[start..end];
        let ops = match (crc32fast::hash(body) == crc).then(|| decode_body(body)).flatten() {
            Some(ops) => ops,
            None if end == bytes.len() => break,
            None => return Err(StoreError::Corrupted { offset: offset as u64 }),
        };
        for op in ops {
            let replaced = match op {
                BatchOperation::Put { key, value } => data.insert(key, value).is_some(),
                BatchOperation::Delete { key } => data.remove(&key).is_some(),
            };
            garbage += usize::from(replaced);
        }
        offset = end;
    }
    Ok((offset, garbage))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(b)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let out = self.bytes.get(self.pos..self.pos.checked_add(n)?)?;
        self.pos += n;
        Some(out)
    }

    fn take_u32(&mut self) -> Option<usize> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }
}

fn decode_body(body: &[u8]) -> Option<Vec<BatchOperation>> {
    let mut c = Cursor { bytes: body, pos: 0 };
    let count = c.take_u32()?;
    let mut ops = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let tag = *c.take(1)?.first()?;
        let klen = c.take_u32()?;
        let key = c.take(klen)?.to_vec();
        match tag {
            OP_PUT => {
                let vlen = c.take_u32()?;
                let value = c.take(vlen)?.to_vec();
                ops.push(BatchOperation::Put { key, value });
            }
            OP_DELETE => ops.push(BatchOperation::Delete { key }),
            _ => return None,
        }
    }
    (c.pos == body.len()).then_some(ops)
}
