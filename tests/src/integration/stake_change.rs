//! # Validator Stake Change
//!
//! Six nodes start with stakes 75/75/12.5/12.5/12.5/12.5 and process the same
//! consensus blocks. The driver owner raises the four small stakes to match
//! the large ones and asks for an epoch advance; the next block seals the
//! epoch with the balanced set on every node.
//!
//! ## Flow Tested
//!
//! 1. Weight updates are recorded as pending profiles, not applied.
//! 2. The seal installs the new set identically on all six nodes.
//! 3. Blocks keep flowing in the new epoch and no node falls behind.

#[cfg(test)]
mod tests {
    use crate::fixtures::{key, profiles, signed, Chain, EventFactory};
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{Address, Hash, Rules, Transaction, Validators, U256};
    use sn_08_block_processor::{DriverCall, StateReader, DRIVER_ADDRESS};

    const NODES: usize = 6;
    const LARGE: u64 = 6_000;
    const SMALL: u64 = 1_000;

    struct Network {
        nodes: Vec<Chain>,
        events: EventFactory,
        owner: Secp256k1KeyPair,
        owner_nonce: u64,
    }

    impl Network {
        fn new() -> Self {
            let validators: Vec<_> = (1..=NODES as u8).map(key).collect();
            let owner = key(77);
            let weights = [LARGE, LARGE, SMALL, SMALL, SMALL, SMALL];
            let alloc = [(owner.address(), U256::exp10(21))];
            let nodes = (0..NODES)
                .map(|_| {
                    Chain::new(
                        Rules::fake_net(),
                        profiles(&validators, &weights),
                        &alloc,
                        Some(owner.address()),
                    )
                })
                .collect();
            Self {
                nodes,
                events: EventFactory::default(),
                owner,
                owner_nonce: 0,
            }
        }

        fn owner_tx(&mut self, to: Address, data: Vec<u8>) -> Transaction {
            let tx = signed(&self.owner, self.owner_nonce, to, U256::zero(), data, 100_000, 10);
            self.owner_nonce += 1;
            tx
        }

        fn driver(&mut self, call: DriverCall) -> Transaction {
            self.owner_tx(DRIVER_ADDRESS, call.encode())
        }

        /// Feed one consensus block to every node; all must agree on the
        /// outcome.
        fn commit(
            &mut self,
            creator: u32,
            secs: u64,
            txs: Vec<Transaction>,
        ) -> Option<Validators> {
            let epoch = self.nodes[0].store.epoch_state().epoch;
            let event = self.events.event(epoch, creator, secs, txs);
            let sealed: Vec<Option<Validators>> =
                self.nodes.iter().map(|n| n.commit(&[event.clone()])).collect();
            assert!(sealed.windows(2).all(|w| w[0] == w[1]), "nodes disagree on seal");
            self.assert_in_sync();
            sealed.into_iter().next().flatten()
        }

        fn heads(&self) -> Vec<(u64, Hash)> {
            self.nodes.iter().map(Chain::head).collect()
        }

        fn assert_in_sync(&self) {
            let heads = self.heads();
            assert!(heads.windows(2).all(|w| w[0] == w[1]), "heads {heads:?}");
            let roots: Vec<Hash> = self.nodes.iter().map(|n| n.evm.state_root()).collect();
            assert!(roots.windows(2).all(|w| w[0] == w[1]));
        }
    }

    fn weights(validators: &Validators) -> Vec<u32> {
        (1..=NODES as u32).map(|id| validators.get_weight_by_id(id)).collect()
    }

    #[test]
    fn test_balanced_stakes_after_epoch_seal() {
        let mut net = Network::new();
        let genesis = net.nodes[0].store.epoch_state();
        assert_eq!(
            weights(&genesis.validators),
            vec![6_000, 6_000, 1_000, 1_000, 1_000, 1_000]
        );

        let mut txs: Vec<Transaction> = (3..=NODES as u32)
            .map(|id| {
                net.driver(DriverCall::UpdateValidatorWeight {
                    id,
                    weight: U256::from(LARGE),
                })
            })
            .collect();
        txs.push(net.driver(DriverCall::AdvanceEpochs(1)));
        assert!(net.commit(1, 1, txs).is_none());

        for node in &net.nodes {
            let bs = node.store.block_state();
            assert_eq!(bs.advance_epochs, 1);
            for id in 3..=NODES as u32 {
                assert_eq!(bs.next_validator_profiles[&id].weight, U256::from(LARGE));
            }
            assert_eq!(node.store.epoch_state().epoch, genesis.epoch);
        }

        let sealed = net.commit(2, 5, Vec::new()).expect("epoch sealed");
        assert_eq!(sealed.len(), NODES);
        assert_eq!(weights(&sealed), vec![LARGE as u32; NODES]);
        for node in &net.nodes {
            let es = node.store.epoch_state();
            assert_eq!(es.epoch, genesis.epoch + 1);
            assert_eq!(es.validators.sorted_ids().len(), NODES);
            assert_eq!(weights(&es.validators), vec![LARGE as u32; NODES]);
            assert_eq!(node.store.block_state().advance_epochs, 0);
        }

        let sealed_at = net.heads()[0].0;
        for round in 0..6u64 {
            let creator = (round % NODES as u64) as u32 + 1;
            let pay = net.owner_tx(Address::repeat_byte(0x60 + round as u8), Vec::new());
            assert!(net.commit(creator, 10 + round, vec![pay]).is_none());
        }
        assert_eq!(net.heads()[0].0, sealed_at + 6);
    }

    #[test]
    fn test_zero_weight_removes_validator_everywhere() {
        let mut net = Network::new();
        let txs = vec![
            net.driver(DriverCall::UpdateValidatorWeight {
                id: 6,
                weight: U256::zero(),
            }),
            net.driver(DriverCall::AdvanceEpochs(1)),
        ];
        net.commit(1, 1, txs);
        let sealed = net.commit(3, 5, Vec::new()).expect("epoch sealed");
        assert_eq!(sealed.len(), NODES - 1);
        assert!(!sealed.exists(6));
        for node in &net.nodes {
            assert!(!node.store.epoch_state().validators.exists(6));
        }
    }
}
