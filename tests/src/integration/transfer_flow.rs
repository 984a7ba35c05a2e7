//! # Fake-Net Transfer Flow
//!
//! A single-validator fake net driven end to end: signed transactions enter
//! the pool, the emitter packs them into events, the solo consensus commits
//! every event and the block processor executes the transfers.
//!
//! ## Flow Tested
//!
//! 1. The validator funds ten accounts.
//! 2. Each account "votes" by sending a fixed amount to option `i mod 3`.
//! 3. Option 0 collects four votes; every voter paid exactly value plus gas.

#[cfg(test)]
mod tests {
    use node_runtime::{fakenet::fake_key, Node, NodeConfig, UpgradeSet};
    use shared_crypto::{Secp256k1KeyPair, TxSigner};
    use shared_types::{Address, Hash, Receipt, Transaction, TxType, GWEI, NANOS_PER_SEC, U256};
    use sn_07_emitter::ManualClock;
    use sn_08_block_processor::StateReader;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast::error::RecvError;

    const START: u64 = 10_000 * NANOS_PER_SEC;
    const VOTERS: u8 = 10;
    const OPTIONS: u8 = 3;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn funding() -> U256 {
        U256::exp10(18)
    }

    fn vote_value() -> U256 {
        U256::from(1_000u64)
    }

    fn option(i: u8) -> Address {
        Address::repeat_byte(0xc0 + i % OPTIONS)
    }

    fn voter(i: u8) -> Secp256k1KeyPair {
        Secp256k1KeyPair::from_bytes([100 + i; 32]).unwrap()
    }

    fn node(upgrades: UpgradeSet) -> (Node, Arc<ManualClock>) {
        let mut config = NodeConfig::default();
        config.fakenet.upgrades = upgrades;
        config.fakenet.genesis_time = Some(START / NANOS_PER_SEC - 10);
        let clock = Arc::new(ManualClock::new(START));
        let node = Node::build_with_clock(config, clock.clone()).unwrap();
        (node, clock)
    }

    fn transfer(
        node: &Node,
        from: &Secp256k1KeyPair,
        nonce: u64,
        to: Address,
        value: U256,
    ) -> Transaction {
        let tx = Transaction {
            tx_type: TxType::DynamicFee,
            nonce,
            gas: 21_000,
            gas_fee_cap: U256::from(10 * GWEI),
            to: Some(to),
            value,
            ..Default::default()
        };
        TxSigner::new(node.store().epoch_state().rules.network_id)
            .sign(tx, from)
            .unwrap()
    }

    /// Tick the emitter until the pool is empty.
    fn drain(node: &Node, clock: &ManualClock) {
        for _ in 0..30 {
            if node.selector().is_empty() {
                return;
            }
            clock.advance(NANOS_PER_SEC);
            node.emitter().tick().unwrap();
            node.processor().wait_idle().unwrap();
            let head = node.store().block_state().last_block.idx;
            node.prune_pool(head).unwrap();
        }
        panic!("pool not drained");
    }

    fn receipts(node: &Node) -> HashMap<Hash, Receipt> {
        let head = node.store().block_state().last_block.idx;
        (1..=head)
            .filter_map(|n| node.store().block(n).unwrap())
            .flat_map(|b| b.receipts)
            .map(|r| (r.tx_hash, r))
            .collect()
    }

    fn run_ballot(upgrades: UpgradeSet) {
        let (node, clock) = node(upgrades);
        let validator = fake_key(1).unwrap();

        for i in 0..VOTERS {
            let tx = transfer(&node, &validator, i as u64, voter(i).address(), funding());
            node.submit(tx).unwrap();
        }
        drain(&node, &clock);
        for i in 0..VOTERS {
            assert_eq!(node.evm().balance(&voter(i).address()), funding());
        }

        let mut votes = Vec::new();
        for i in 0..VOTERS {
            let tx = transfer(&node, &voter(i), 0, option(i), vote_value());
            votes.push((i, node.submit(tx).unwrap()));
        }
        drain(&node, &clock);

        assert_eq!(node.evm().balance(&option(0)), vote_value() * 4);
        assert_eq!(node.evm().balance(&option(1)), vote_value() * 3);
        assert_eq!(node.evm().balance(&option(2)), vote_value() * 3);

        let receipts = receipts(&node);
        for (i, hash) in votes {
            let r = &receipts[&hash];
            assert!(r.succeeded());
            let fee = U256::from(r.gas_used) * r.effective_gas_price;
            let account = node.evm().account(&voter(i).address());
            assert_eq!(account.balance, funding() - vote_value() - fee, "voter {i}");
            assert_eq!(account.nonce, 1);
        }
        assert!(!node.is_locked());
    }

    // =========================================================================
    // INTEGRATION TESTS
    // =========================================================================

    #[test]
    fn test_ballot_transfers_on_classic_blocks() {
        run_ballot(UpgradeSet::Sonic);
    }

    #[test]
    fn test_ballot_transfers_on_proposed_blocks() {
        run_ballot(UpgradeSet::SingleProposer);
    }

    /// The running node picks up a submitted transfer with the wall clock.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_running_node_includes_submitted_transfer() {
        let node = Arc::new(Node::build(NodeConfig::default()).unwrap());
        let mut heads = node.processor().feed().subscribe();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let runner = {
            let node = Arc::clone(&node);
            tokio::spawn(async move {
                node.run(async {
                    let _ = stopped.await;
                })
                .await
            })
        };

        let to = Address::repeat_byte(0x77);
        let tx = transfer(&node, &fake_key(1).unwrap(), 0, to, U256::from(5u64));
        let hash = node.submit(tx).unwrap();

        let included = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match heads.recv().await {
                    Ok(head) if head.block.transactions.iter().any(|t| t.hash() == hash) => {
                        return head.number();
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(e) => panic!("head feed closed: {e}"),
                }
            }
        })
        .await
        .expect("transfer not included in time");

        assert!(included >= 1);
        assert_eq!(node.evm().balance(&to), U256::from(5u64));
        stop.send(()).unwrap();
        runner.await.unwrap().unwrap();
    }
}
