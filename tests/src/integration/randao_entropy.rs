//! # RANDAO Entropy
//!
//! Chains reveals the way consecutive proposers do: each block's proposer
//! signs the previous randao and the verified reveal hashes into the next.
//! The concatenated randao stream must be statistically indistinguishable
//! from uniform bytes.

#[cfg(test)]
mod tests {
    use crate::fixtures::key;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{sha256, Hash};
    use sn_01_randao::{new_reveal, normalized_shannon_entropy, verify_reveal};

    const PROPOSERS: u8 = 6;

    /// Randao stream of `blocks` blocks starting from `seed`.
    fn randao_stream(proposers: &[Secp256k1KeyPair], seed: u64, blocks: usize) -> Vec<u8> {
        let mut randao: Hash = sha256(&seed.to_be_bytes());
        let mut stream = Vec::with_capacity(blocks * 32);
        for block in 0..blocks {
            let proposer = &proposers[block % proposers.len()];
            let reveal = new_reveal(&randao, proposer).unwrap();
            randao = verify_reveal(&reveal, &randao, &proposer.validator_pubkey()).unwrap();
            stream.extend_from_slice(randao.as_bytes());
        }
        stream
    }

    fn proposers() -> Vec<Secp256k1KeyPair> {
        (1..=PROPOSERS).map(key).collect()
    }

    #[test]
    fn test_short_run_entropy() {
        let stream = randao_stream(&proposers(), 0, 1_000);
        let entropy = normalized_shannon_entropy(&stream);
        assert!(entropy > 0.999, "entropy {entropy}");
    }

    #[test]
    fn test_stream_is_reproducible() {
        let proposers = proposers();
        assert_eq!(
            randao_stream(&proposers, 3, 20),
            randao_stream(&proposers, 3, 20)
        );
        assert_ne!(
            randao_stream(&proposers, 3, 20),
            randao_stream(&proposers, 4, 20)
        );
    }

    #[test]
    #[ignore = "100 000 signatures; run with --ignored"]
    fn test_long_run_entropy() {
        let proposers = proposers();
        for run in 0..10 {
            let stream = randao_stream(&proposers, run, 10_000);
            let entropy = normalized_shannon_entropy(&stream);
            assert!(entropy > 0.9999, "run {run}: entropy {entropy}");
        }
    }
}
