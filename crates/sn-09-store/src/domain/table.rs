//! # Typed Tables
//!
//! A table is a key prefix over the shared key/value store with a value
//! codec. Numeric keys are big-endian so prefix scans yield ascending order.

use crate::error::{Result, StoreError};
use crate::ports::{BatchOperation, KeyValueStore};
use shared_types::upgrades::{decode_upgrade_heights, encode_upgrade_heights};
use shared_types::{
    Block, BlockState, EpochState, EventPayload, Receipt, TxPosition, UpgradeHeight,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Big-endian key of a height or period.
pub fn be_key(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// Value codec of a table.
pub trait Codec: Sized {
    /// Encode for storage.
    fn encode(&self) -> Vec<u8>;
    /// Decode from storage.
    fn decode(bytes: &[u8]) -> std::result::Result<Self, String>;
}

/// Implement [`Codec`] with bincode for serde types.
#[macro_export]
macro_rules! bincode_codec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::domain::table::Codec for $ty {
                fn encode(&self) -> Vec<u8> {
                    // Serializing into a Vec only fails for unsized sequences.
                    bincode::serialize(self).unwrap_or_default()
                }

                fn decode(bytes: &[u8]) -> std::result::Result<Self, String> {
                    bincode::deserialize(bytes).map_err(|e| e.to_string())
                }
            }
        )*
    };
}

bincode_codec!(
    u64,
    String,
    Block,
    Vec<Receipt>,
    TxPosition,
    BlockState,
    EpochState,
);

impl Codec for EventPayload {
    fn encode(&self) -> Vec<u8> {
        self.to_bytes()
    }

    fn decode(bytes: &[u8]) -> std::result::Result<Self, String> {
        EventPayload::from_bytes(bytes).map_err(|e| e.to_string())
    }
}

impl Codec for Vec<UpgradeHeight> {
    fn encode(&self) -> Vec<u8> {
        encode_upgrade_heights(self)
    }

    fn decode(bytes: &[u8]) -> std::result::Result<Self, String> {
        decode_upgrade_heights(bytes).map_err(|e| e.to_string())
    }
}

/// Prefix-scoped view of a key/value store.
pub struct Table<V> {
    kv: Arc<dyn KeyValueStore>,
    prefix: &'static [u8],
    name: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V: Codec> Table<V> {
    /// Table `name` stored under `prefix`.
    pub fn new(kv: Arc<dyn KeyValueStore>, prefix: &'static [u8], name: &'static str) -> Self {
        Self {
            kv,
            prefix,
            name,
            _value: PhantomData,
        }
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut k = Vec::with_capacity(self.prefix.len() + key.len());
        k.extend_from_slice(self.prefix);
        k.extend_from_slice(key);
        k
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        V::decode(bytes).map_err(|reason| StoreError::Decode {
            table: self.name,
            reason,
        })
    }

    /// Value under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<V>> {
        self.kv
            .get(&self.full_key(key))?
            .map(|b| self.decode(&b))
            .transpose()
    }

    /// Store `value` under `key`.
    pub fn put(&self, key: &[u8], value: &V) -> Result<()> {
        self.kv.put(&self.full_key(key), &value.encode())
    }

    /// A put for an atomic batch.
    pub fn put_op(&self, key: &[u8], value: &V) -> BatchOperation {
        BatchOperation::put(self.full_key(key), value.encode())
    }

    /// All entries with keys `>= from`, in key order, prefix stripped.
    pub fn scan_from(&self, from: &[u8]) -> Result<Vec<(Vec<u8>, V)>> {
        self.kv
            .prefix_scan(self.prefix)?
            .into_iter()
            .map(|(k, v)| (k[self.prefix.len()..].to_vec(), v))
            .filter(|(k, _)| k.as_slice() >= from)
            .map(|(k, v)| Ok((k, self.decode(&v)?)))
            .collect()
    }
}
