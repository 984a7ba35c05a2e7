//! # SN-09: Store
//!
//! ## Purpose
//!
//! Persists what block production needs across restarts: blocks and their
//! indices, receipts, block and epoch state, the upgrade history and
//! certification statements. Events live in an epoch-scoped sub-database.
//!
//! ## Layout
//!
//! ```text
//!   Store ──► Table<V> ──► KeyValueStore (MemoryStore | FileStore)
//!     │
//!     └────► EpochStore ──► EpochDbProducer ──► one database per epoch
//! ```
//!
//! | Prefix | Table | Key |
//! |--------|-------|-----|
//! | `b` | blocks | BE u64 height |
//! | `h` | block hashes | block hash |
//! | `r` | receipts | BE u64 height |
//! | `x` | tx positions | tx hash |
//! | `c` | block statements | BE u64 height |
//! | `m` | block/epoch state, upgrade heights | name |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{FileProducer, FileStore, MemoryProducer, MemoryStore};
pub use domain::certification::BlockStatement;
pub use domain::epoch_store::{EpochDbProducer, EpochStore};
pub use domain::table::{be_key, Codec, Table};
pub use error::{Result, StoreError};
pub use ports::{BatchOperation, KeyValueStore};
pub use service::Store;

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 9;
