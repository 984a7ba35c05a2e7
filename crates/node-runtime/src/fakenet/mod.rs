//! Single-validator fake net: genesis, event index, solo consensus and the
//! emitter's world.

pub mod consensus;
pub mod genesis;
pub mod index;
pub mod replay;
pub mod world;

pub use consensus::SoloConsensus;
pub use genesis::{fake_key, FakeGenesis, FAKE_WEIGHT};
pub use index::EventIndex;
pub use replay::replay_blocks;
pub use world::{EmitterListener, SoloWorld};
