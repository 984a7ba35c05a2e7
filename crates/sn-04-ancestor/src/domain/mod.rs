//! Ancestor indexing domain.

pub mod dag;
pub mod payload;
pub mod progress;
pub mod quorum;
pub mod search;

/// Score of a candidate parent set; higher is better.
pub type Metric = u64;
