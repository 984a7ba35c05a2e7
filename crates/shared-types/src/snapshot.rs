//! # Read-Copy-Update Snapshots
//!
//! Hot read paths (validators, rules, upgrade heights) load an `Arc` of an
//! immutable value. Writers build a fresh value and swap it in; readers that
//! still hold the previous `Arc` keep a consistent view.

use parking_lot::RwLock;
use std::sync::Arc;

/// Atomically replaceable immutable value.
#[derive(Debug, Default)]
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    /// Wrap an initial value.
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// Current value.
    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current value.
    pub fn store(&self, value: T) {
        *self.current.write() = Arc::new(value);
    }

    /// Derive a new value from the current one and swap it in.
    ///
    /// The write lock is held for the duration of `f`, so concurrent updates
    /// never lose each other's changes.
    pub fn update<F>(&self, f: F) -> Arc<T>
    where
        F: FnOnce(&T) -> T,
    {
        let mut guard = self.current.write();
        let next = Arc::new(f(&guard));
        *guard = Arc::clone(&next);
        next
    }
}
