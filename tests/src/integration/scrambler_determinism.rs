//! # Scrambler Determinism
//!
//! A block's transaction order must be identical on every node whatever
//! order the events delivered the transactions in. 256 distinct
//! transactions from 32 senders, some sharing a nonce at different prices,
//! are scrambled under seed 42 in many input orders.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use shared_types::{Address, Hash, Transaction, TxType, GWEI, U256};
    use sn_02_scrambler::{scramble, ScramblerEntry, SenderTx};
    use std::collections::{HashMap, HashSet};

    const SEED: u64 = 42;
    const SENDERS: u64 = 32;
    const UNIQUE: usize = 256;

    fn entry(sender: u64, nonce: u64, price_gwei: u64) -> SenderTx {
        let tx = Transaction {
            tx_type: TxType::DynamicFee,
            nonce,
            gas: 21_000,
            gas_fee_cap: U256::from(price_gwei) * U256::from(GWEI),
            to: Some(Address::from_low_u64_be(sender)),
            value: U256::from(sender * 1_000 + nonce),
            ..Default::default()
        };
        SenderTx::new(tx, Address::from_low_u64_be(1_000 + sender), Vec::new())
    }

    /// 32 senders with nonces 0..6 plus competing transactions at nonces 2
    /// and 4, followed by 16 duplicates.
    fn input() -> Vec<SenderTx> {
        let mut txs = Vec::new();
        for s in 0..SENDERS {
            for nonce in 0..6 {
                txs.push(entry(s, nonce, 10 + s % 5));
            }
            txs.push(entry(s, 2, 50 + s));
            txs.push(entry(s, 4, 1 + s % 3));
        }
        let dups: Vec<SenderTx> = txs.iter().step_by(16).cloned().collect();
        txs.extend(dups);
        txs
    }

    fn hashes(txs: &[SenderTx]) -> Vec<Hash> {
        txs.iter().map(ScramblerEntry::hash).collect()
    }

    fn assert_sender_order(out: &[SenderTx]) {
        let mut last: HashMap<Address, (u64, U256)> = HashMap::new();
        for e in out {
            if let Some((nonce, price)) = last.get(&e.sender) {
                assert!(e.tx.nonce >= *nonce, "nonce order broken for {:?}", e.sender);
                if e.tx.nonce == *nonce {
                    assert!(e.gas_price() <= *price, "price order broken for {:?}", e.sender);
                }
            }
            last.insert(e.sender, (e.tx.nonce, e.gas_price()));
        }
    }

    #[test]
    fn test_fixture_has_expected_shape() {
        let txs = input();
        assert_eq!(txs.len(), UNIQUE + 16);
        assert_eq!(hashes(&txs).into_iter().collect::<HashSet<_>>().len(), UNIQUE);
    }

    #[test]
    fn test_scramble_is_permutation_of_deduplicated_set() {
        let txs = input();
        let unique: HashSet<Hash> = hashes(&txs).into_iter().collect();
        let out = scramble(txs, SEED);
        assert_eq!(out.len(), UNIQUE);
        assert_eq!(hashes(&out).into_iter().collect::<HashSet<_>>(), unique);
        assert_sender_order(&out);
    }

    #[test]
    fn test_shuffled_inputs_agree() {
        let expected = hashes(&scramble(input(), SEED));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut txs = input();
            txs.shuffle(&mut rng);
            assert_eq!(hashes(&scramble(txs, SEED)), expected);
        }
    }

    #[test]
    fn test_seed_changes_order() {
        let a = hashes(&scramble(input(), SEED));
        let b = hashes(&scramble(input(), SEED + 1));
        assert_ne!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_any_permutation_scrambles_identically(
            txs in Just(input()).prop_shuffle()
        ) {
            let expected = hashes(&scramble(input(), SEED));
            let out = scramble(txs, SEED);
            prop_assert_eq!(hashes(&out), expected);
        }
    }
}
