//! Scrambler domain logic.

pub mod entry;
pub mod rng;
pub mod scramble;
