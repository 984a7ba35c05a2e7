//! RANDAO domain logic.

pub mod entropy;
pub mod reveal;
