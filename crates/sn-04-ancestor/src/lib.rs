//! # SN-04: Ancestor Indexing
//!
//! ## Purpose
//!
//! Indexes the current epoch's DAG with vector clocks and scores candidate
//! parent sets, so the emitter references the events that spread the most
//! new knowledge.
//!
//! ## Components
//!
//! ```text
//!                      ┌──────────────┐
//!   EventHeader ──────►│   DagIndex   │ highest-before / lowest-after,
//!                      └──────┬───────┘ fork detection
//!          ┌──────────────────┼───────────────────┐
//!          ▼                  ▼                   ▼
//!   QuorumIndexer      ProgressIndexer      PayloadIndexer
//!   (quorum seqs)   (forkless-cause or      (payload lamport,
//!                     strongly-reach)         LRU)
//!          └──────────────────┼───────────────────┘
//!                             ▼
//!                    choose_parents(plan)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::AncestorConfig;
pub use domain::dag::{DagIndex, ObservedSeq, Vertex};
pub use domain::payload::PayloadIndexer;
pub use domain::progress::{ProgressIndexer, ProgressMetric};
pub use domain::quorum::QuorumIndexer;
pub use domain::search::{choose_parents, plan_strategies, SearchStrategy};
pub use domain::Metric;
pub use error::{AncestorError, Result};
pub use service::AncestorIndex;

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 4;
