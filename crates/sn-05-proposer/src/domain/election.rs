//! # Proposer Election
//!
//! `proposer(V, block, attempt)` draws one validator with probability
//! proportional to stake. The draw is seeded by `sha256(block ‖ attempt)`
//! (big-endian u64 and u32), reduced modulo the total weight, and resolved
//! by walking the weight-sorted validator list.

use crate::error::{Result, TurnError};
use shared_types::{sha256_concat, BlockNumber, ValidatorId, Validators, U256};

/// Elect the proposer of `block` on the given `attempt`.
pub fn get_proposer(
    validators: &Validators,
    block: BlockNumber,
    attempt: u32,
) -> Result<ValidatorId> {
    let total = validators.total_weight();
    if validators.is_empty() || total == 0 {
        return Err(TurnError::NoValidators);
    }

    let seed = sha256_concat(&[&block.to_be_bytes(), &attempt.to_be_bytes()]);
    let draw = (U256::from_big_endian(seed.as_bytes()) % U256::from(total)).low_u64();

    let mut cumulative = 0u64;
    for (id, weight) in validators.iter() {
        cumulative += u64::from(weight);
        if draw < cumulative {
            return Ok(id);
        }
    }
    // `draw < total` and the weights sum to `total`.
    Err(TurnError::NoValidators)
}
