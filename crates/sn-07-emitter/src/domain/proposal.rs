//! Proposal building for version-3 events.

use crate::error::Result;
use crate::ports::LatestBlock;
use shared_crypto::ValidatorSigner;
use shared_types::{Proposal, Transaction, UnixNanos, MAX_BLOCK_SIZE, MAX_PROPOSAL_TX_SIZE};
use sn_01_randao::new_reveal;

/// Bytes kept free for the block header when the block size is capped.
const HEADER_RESERVE: u64 = 1024;

/// True if a proposal is worth making: transactions wait, or the chain has
/// been quiet for the empty-block skip period.
pub fn wants_proposal(
    pending_txs: bool,
    now: UnixNanos,
    head_time: UnixNanos,
    skip_period: UnixNanos,
) -> bool {
    pending_txs || now >= head_time.saturating_add(skip_period)
}

/// Byte budget of proposal transactions.
pub fn proposal_size_limit(brio: bool) -> u64 {
    if brio {
        MAX_PROPOSAL_TX_SIZE.min(MAX_BLOCK_SIZE - HEADER_RESERVE)
    } else {
        MAX_PROPOSAL_TX_SIZE
    }
}

/// Proposal for the block after `head`, revealing this validator's
/// randomness over the head's PREVRANDAO.
pub fn build_proposal(
    head: &LatestBlock,
    time: UnixNanos,
    transactions: Vec<Transaction>,
    signer: &dyn ValidatorSigner,
) -> Result<Proposal> {
    Ok(Proposal {
        number: head.number + 1,
        parent_hash: head.hash,
        time: time.max(head.time + 1),
        transactions,
        randao_reveal: new_reveal(&head.prev_randao, signer)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{Hash, U256};
    use sn_01_randao::verify_reveal;

    fn head() -> LatestBlock {
        LatestBlock {
            number: 9,
            hash: Hash::repeat_byte(9),
            time: 1_000,
            prev_randao: Hash::repeat_byte(3),
            base_fee: U256::from(1u64),
        }
    }

    #[test]
    fn test_wants_proposal() {
        assert!(wants_proposal(true, 1_000, 1_000, 500));
        assert!(!wants_proposal(false, 1_400, 1_000, 500));
        assert!(wants_proposal(false, 1_500, 1_000, 500));
    }

    #[test]
    fn test_proposal_links_head() {
        let key = Secp256k1KeyPair::generate();
        let p = build_proposal(&head(), 900, Vec::new(), &key).unwrap();
        assert_eq!(p.number, 10);
        assert_eq!(p.parent_hash, head().hash);
        assert_eq!(p.time, 1_001);
        assert!(verify_reveal(&p.randao_reveal, &head().prev_randao, &key.validator_pubkey()).is_ok());
    }

    #[test]
    fn test_brio_caps_size() {
        assert!(proposal_size_limit(true) < MAX_BLOCK_SIZE);
        assert_eq!(proposal_size_limit(false), MAX_PROPOSAL_TX_SIZE);
    }
}
