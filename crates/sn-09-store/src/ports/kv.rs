//! # Key/Value Port
//!
//! The storage engine the rest of the node writes through. Implementations
//! are shared between threads, so every method takes `&self`.

use crate::error::Result;

/// Abstract key/value database.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Put a single pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_batch(vec![BatchOperation::put(key, value)])
    }

    /// Delete a key.
    fn delete(&self, key: &[u8]) -> Result<()> {
        self.write_batch(vec![BatchOperation::delete(key)])
    }

    /// Apply all operations or none.
    fn write_batch(&self, operations: Vec<BatchOperation>) -> Result<()>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All pairs whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Flush buffered writes to durable storage.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Close the store; later calls fail with `Closed`.
    fn close(&self);
}

/// One operation of an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a pair.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Delete a key.
    Delete {
        /// Key.
        key: Vec<u8>,
    },
}

impl BatchOperation {
    /// Create a put.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a delete.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}
