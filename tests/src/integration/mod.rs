//! Integration flows across the block-production subsystems.

pub mod block_size;
pub mod proposer_liveness;
pub mod randao_entropy;
pub mod scrambler_determinism;
pub mod stake_change;
pub mod transfer_flow;
