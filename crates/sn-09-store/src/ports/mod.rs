//! Ports of the store.

pub mod kv;

pub use kv::{BatchOperation, KeyValueStore};
