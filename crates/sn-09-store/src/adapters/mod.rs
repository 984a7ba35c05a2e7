//! Storage engines.

pub mod file;
pub mod memory;
pub mod producer;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use producer::{FileProducer, MemoryProducer};
