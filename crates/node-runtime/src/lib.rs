//! # Node Runtime
//!
//! Configuration, logging bootstrap and subsystem wiring of the validator
//! node. The binary in `main.rs` runs a single-validator fake net: the node
//! is alone on its network, so every event it emits is final immediately.
//!
//! ## Flow
//!
//! ```text
//!   submit(tx) ──► TxSelector ◄── prune on every new block ──┐
//!                      │                                      │
//!   Emitter ── tick ───┴─► SoloWorld::process                 │
//!                              │ checkers (light + heavy)     │
//!                              │ EventIndex ─► epoch store    │
//!                              │ Emitter::on_event_connected  │
//!                              ▼                              │
//!                        SoloConsensus ─► BlockProcessor ─► ChainHeadFeed
//! ```
//!
//! ## Modules
//!
//! - `config` - TOML configuration with environment overrides
//! - `logging` - tracing subscriber setup
//! - `fakenet` - genesis, event index, solo consensus, emitter world
//! - `node` - startup sequence, run loop and shutdown

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod fakenet;
pub mod logging;
pub mod node;

pub use config::{
    ConfigError, FakeNetConfig, LogConfig, NodeConfig, UpgradeSet, ENV_DATA_DIR, ENV_LOG_LEVEL,
    ENV_VALIDATOR_ID,
};
pub use error::{NodeError, Result};
pub use node::Node;

/// Node version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
