//! Ports of the emitter.
//!
//! - [`World`]: everything the emitter reads from or hands to the node
//! - [`Clock`]: wall-clock time

pub mod clock;
pub mod world;

pub use clock::Clock;
pub use world::{LatestBlock, PendingVotes, World};
