//! # SN-07: Emitter
//!
//! ## Purpose
//!
//! Creates this validator's events. Decides when an event is due, picks its
//! parents, fills it with transactions (version 2) or a block proposal
//! (version 3), spends gas power, signs it and hands it to the node. Guards
//! against two processes signing for the same validator.
//!
//! ## Flow
//!
//! ```text
//!   World ── connected events ──► on_event_connected ──► AncestorIndex
//!                                                         │ challenges
//!   spawn() ── tick ──► create_event ◄────────────────────┘
//!                           │  pacing, sync checks, error lock
//!                           ▼
//!              parents ─► payload ─► gas fit ─► sign
//!                           │
//!              World::process ─► prev-emitted file ─► broadcast
//!
//!   BlockProcessor ── confirmed events ──► on_event_confirmed
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{EvmTxRunner, ManualClock, SystemClock};
pub use config::{EmitIntervals, EmitterConfig};
pub use domain::{ErrorLock, PrevEmitted, ERROR_LOCK_FILE};
pub use error::{EmitterError, Result};
pub use metrics::EmitterMetrics;
pub use ports::{Clock, LatestBlock, PendingVotes, World};
pub use service::Emitter;

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 7;
