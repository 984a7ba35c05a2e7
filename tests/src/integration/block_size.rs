//! # Block Size Ceiling
//!
//! After Brio a classic block stops taking transactions before its encoded
//! size would pass [`MAX_BLOCK_SIZE`](shared_types::MAX_BLOCK_SIZE). One
//! hundred transactions carrying 125 000 bytes each are spread across ten
//! senders; whatever a block leaves out is carried again by the next event,
//! the way the pool re-offers it.

#[cfg(test)]
mod tests {
    use crate::fixtures::{key, profiles, signed, Chain, EventFactory};
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{Address, Hash, Rules, Transaction, Upgrades, MAX_BLOCK_SIZE, U256};
    use std::collections::HashSet;

    const SENDERS: u8 = 10;
    const PER_SENDER: u64 = 10;
    const PAYLOAD: usize = 125_000;

    fn senders() -> Vec<Secp256k1KeyPair> {
        (0..SENDERS).map(|i| key(50 + i)).collect()
    }

    fn chain(upgrades: Upgrades, senders: &[Secp256k1KeyPair]) -> Chain {
        let validators: Vec<_> = (1..=3).map(key).collect();
        let alloc: Vec<(Address, U256)> = senders
            .iter()
            .map(|k| (k.address(), U256::exp10(21)))
            .collect();
        Chain::new(
            Rules::fake_net().with_upgrades(upgrades),
            profiles(&validators, &[100, 100, 100]),
            &alloc,
            None,
        )
    }

    fn heavy_txs(senders: &[Secp256k1KeyPair]) -> Vec<Transaction> {
        let mut txs = Vec::new();
        for nonce in 0..PER_SENDER {
            for (i, sender) in senders.iter().enumerate() {
                let data = vec![0xab; PAYLOAD];
                let gas = 21_000 + 16 * PAYLOAD as u64;
                let to = Address::repeat_byte(0x10 + i as u8);
                txs.push(signed(sender, nonce, to, U256::one(), data, gas, 100));
            }
        }
        txs
    }

    #[test]
    fn test_brio_blocks_stay_under_size_limit() {
        let senders = senders();
        let chain = chain(Upgrades::brio(), &senders);
        let mut events = EventFactory::default();
        let mut pending = heavy_txs(&senders);
        let total = pending.len();
        assert_eq!(total, 100);

        let mut included: HashSet<Hash> = HashSet::new();
        let mut blocks = 0;
        for round in 1..=10u64 {
            if pending.is_empty() {
                break;
            }
            let epoch = chain.store.epoch_state().epoch;
            let event = events.event(epoch, 1 + (round % 3) as u32, round, pending.clone());
            chain.commit(&[event]);

            let (head, _) = chain.head();
            let block = chain.block(head).unwrap();
            assert!(
                block.size() <= MAX_BLOCK_SIZE,
                "block {head} has {} bytes",
                block.size()
            );
            assert_eq!(block.receipts.len(), block.transactions.len());
            assert!(block.receipts.iter().all(|r| r.status == 1));
            included.extend(block.transactions.iter().map(Transaction::hash));
            pending.retain(|tx| !included.contains(&tx.hash()));
            blocks += 1;
        }

        assert!(pending.is_empty(), "{} transactions never included", pending.len());
        assert_eq!(included.len(), total);
        assert!(blocks >= 2, "12.5 MB cannot fit a single block");
    }

    #[test]
    fn test_pre_brio_block_takes_everything() {
        let senders = senders();
        let chain = chain(Upgrades::allegro(), &senders);
        let mut events = EventFactory::default();
        let txs = heavy_txs(&senders);
        let epoch = chain.store.epoch_state().epoch;
        chain.commit(&[events.event(epoch, 1, 1, txs)]);

        let block = chain.block(1).unwrap();
        assert_eq!(block.transactions.len(), 100);
        assert!(block.size() > MAX_BLOCK_SIZE);
    }
}
