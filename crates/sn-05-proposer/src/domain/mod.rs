//! Single-proposer domain logic.

pub mod election;
pub mod extraction;
pub mod turn;
