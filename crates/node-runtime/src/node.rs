//! # Node
//!
//! Builds the subsystems in dependency order and runs them until shutdown
//! or a permanent error.
//!
//! ## Startup Sequence
//!
//! 1. Validate the configuration, open the error lock
//! 2. Open the store, write genesis on first start
//! 3. Replay stored blocks into the world state
//! 4. Load the epoch's events, build the emitter, replay events into it
//! 5. Spawn the emitter loop and the chain head listener

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::fakenet::{
    fake_key, replay_blocks, EmitterListener, EventIndex, FakeGenesis, SoloConsensus, SoloWorld,
};
use parking_lot::Mutex;
use shared_crypto::{SenderCache, TxSigner};
use shared_types::{Hash, Transaction};
use sn_03_event_check::{CheckMetrics, Checkers};
use sn_06_tx_selector::{SelectorMetrics, TxSelector};
use sn_07_emitter::{Clock, Emitter, ErrorLock, SystemClock};
use sn_08_block_processor::{BlockMetrics, BlockProcessor, StateReader, TransferEvm};
use sn_09_store::{FileProducer, FileStore, MemoryProducer, MemoryStore, Store};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running validator node.
pub struct Node {
    config: NodeConfig,
    store: Arc<Store>,
    evm: Arc<TransferEvm>,
    processor: Arc<BlockProcessor>,
    world: Arc<SoloWorld>,
    selector: Arc<TxSelector>,
    senders: Arc<SenderCache>,
    emitter: Arc<Emitter>,
    clock: Arc<dyn Clock>,
    error_lock: Arc<ErrorLock>,
    heads_stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl Node {
    /// Build a node on the system clock.
    pub fn build(config: NodeConfig) -> Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock))
    }

    /// Build a node reading time from `clock`.
    pub fn build_with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let error_lock = Arc::new(match &config.data_dir {
            Some(dir) => ErrorLock::open(dir)?,
            None => ErrorLock::in_memory(),
        });

        let store = Arc::new(open_store(&config)?);
        let genesis = FakeGenesis::new(&config.fakenet, clock.now())?;
        let evm = Arc::new(genesis.evm());
        genesis.apply(&store, &evm)?;

        let rules = store.epoch_state().rules.clone();
        let senders = Arc::new(SenderCache::new(
            TxSigner::new(rules.network_id),
            config.heavy_check.sender_cache_size,
        ));
        replay_blocks(&store, &evm, &senders)?;

        let processor = Arc::new(BlockProcessor::new(
            config.block_processor.clone(),
            Arc::clone(&store),
            evm.clone(),
            Arc::clone(&senders),
            Arc::new(BlockMetrics::default()),
        )?);
        let index = Arc::new(EventIndex::new(Arc::clone(&store)));
        let stored = index.load()?;
        let checkers = Checkers::new(
            index.clone(),
            Arc::clone(&senders),
            Arc::new(CheckMetrics::new()),
        );
        let world = Arc::new(SoloWorld::new(
            index,
            checkers,
            SoloConsensus::new(Arc::clone(&processor)),
            Arc::clone(&evm),
            Arc::clone(&error_lock),
        ));
        let selector = Arc::new(TxSelector::new(
            config.selector.clone(),
            rules.economy.min_gas_price,
            Arc::clone(&senders),
            Arc::new(SelectorMetrics::new()),
        ));

        let emitter = Arc::new(Emitter::new(
            config.emitter_config(),
            world.clone(),
            Arc::new(fake_key(config.validator_id)?),
            Arc::clone(&selector),
            Arc::clone(&clock),
            Arc::clone(&error_lock),
        )?);
        world.attach(&emitter);
        for event in &stored {
            world.replay(event);
        }
        processor.subscribe(Arc::new(EmitterListener::new(&emitter)));

        info!(
            validator = config.validator_id,
            head = store.block_state().last_block.idx,
            epoch = store.epoch_state().epoch,
            replayed_events = stored.len(),
            "[node] ✅ Node built"
        );
        Ok(Self {
            config,
            store,
            evm,
            processor,
            world,
            selector,
            senders,
            emitter,
            clock,
            error_lock,
            heads_stop: Mutex::new(None),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Chain store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// World state.
    pub fn evm(&self) -> &Arc<TransferEvm> {
        &self.evm
    }

    /// Block processor.
    pub fn processor(&self) -> &Arc<BlockProcessor> {
        &self.processor
    }

    /// Emitter.
    pub fn emitter(&self) -> &Arc<Emitter> {
        &self.emitter
    }

    /// The emitter's world.
    pub fn world(&self) -> &Arc<SoloWorld> {
        &self.world
    }

    /// Transaction pool.
    pub fn selector(&self) -> &Arc<TxSelector> {
        &self.selector
    }

    /// True once a permanent error locked the node.
    pub fn is_locked(&self) -> bool {
        self.error_lock.is_locked()
    }

    /// Queue a signed transaction for origination.
    pub fn submit(&self, tx: Transaction) -> Result<Hash> {
        let sender = self.senders.sender(&tx)?;
        let hash = self
            .selector
            .add(tx, self.evm.nonce(&sender), self.clock.now())?;
        self.emitter.note_tx(hash);
        Ok(hash)
    }

    /// Forget pooled transactions made stale by the block `number`.
    pub fn prune_pool(&self, number: u64) -> Result<()> {
        if let Some(block) = self.store.block(number)? {
            let included: Vec<Hash> = block.transactions.iter().map(Transaction::hash).collect();
            let evm = &self.evm;
            self.selector.on_block(&included, |a| evm.nonce(a));
        }
        Ok(())
    }

    /// Run until `shutdown` resolves or the emitter halts. A halted emitter
    /// surfaces as the returned error.
    pub async fn run<F>(self: &Arc<Self>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut emitter_task = self.emitter.spawn();
        let heads_task = self.spawn_head_listener();
        info!(validator = self.config.validator_id, "[node] 🚀 Node running");

        let outcome = tokio::select! {
            _ = shutdown => {
                info!("[node] Shutdown requested");
                self.emitter.stop();
                join(&mut emitter_task).await
            }
            finished = &mut emitter_task => flatten(finished),
        };

        if let Some(stop) = self.heads_stop.lock().take() {
            let _ = stop.send(());
        }
        if let Err(e) = heads_task.await {
            warn!(error = %e, "[node] ⚠️ Chain head listener failed");
        }
        self.shutdown()?;
        outcome
    }

    /// Finish queued blocks, flush and close the store.
    pub fn shutdown(&self) -> Result<()> {
        self.emitter.stop();
        self.processor.stop();
        self.store.flush()?;
        self.store.close();
        info!("[node] 🛑 Node stopped");
        Ok(())
    }

    fn spawn_head_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.heads_stop.lock() = Some(stop_tx);
        let mut heads = self.processor.feed().subscribe();
        let node = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => return,
                    head = heads.recv() => match head {
                        Ok(head) => {
                            info!(
                                number = head.number(),
                                hash = ?head.hash(),
                                txs = head.block.transactions.len(),
                                "[node] ⛓️ New block"
                            );
                            if let Err(e) = node.prune_pool(head.number()) {
                                warn!(error = %e, "[node] ⚠️ Pool not pruned");
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            debug!(missed, "[node] Chain head listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                }
            }
        })
    }
}

fn open_store(config: &NodeConfig) -> Result<Store> {
    Ok(match &config.data_dir {
        Some(dir) => Store::open(
            Arc::new(FileStore::open(dir.join("chain"), config.sync_writes)?),
            Arc::new(FileProducer::new(dir.join("epochs"), config.sync_writes)),
        )?,
        None => Store::open(Arc::new(MemoryStore::new()), Arc::new(MemoryProducer))?,
    })
}

async fn join(task: &mut JoinHandle<sn_07_emitter::Result<()>>) -> Result<()> {
    flatten(task.await)
}

fn flatten(
    finished: std::result::Result<sn_07_emitter::Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match finished {
        Ok(result) => result.map_err(NodeError::from),
        Err(e) => Err(NodeError::Task(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpgradeSet;
    use shared_types::{Address, TxType, GWEI, NANOS_PER_SEC, U256};
    use sn_07_emitter::ManualClock;

    const START: u64 = 1_000 * NANOS_PER_SEC;

    fn config(upgrades: UpgradeSet) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.fakenet.upgrades = upgrades;
        config.fakenet.genesis_time = Some(START / NANOS_PER_SEC - 10);
        config
    }

    fn transfer(node: &Node, nonce: u64, to: Address) -> Transaction {
        let tx = Transaction {
            tx_type: TxType::DynamicFee,
            nonce,
            gas: 21_000,
            gas_fee_cap: U256::from(10 * GWEI),
            to: Some(to),
            value: U256::from(1_000u64),
            ..Default::default()
        };
        TxSigner::new(node.store().epoch_state().rules.network_id)
            .sign(tx, &fake_key(1).unwrap())
            .unwrap()
    }

    #[test]
    fn test_transfer_reaches_a_block() {
        let clock = Arc::new(ManualClock::new(START));
        let node = Node::build_with_clock(config(UpgradeSet::Sonic), clock.clone()).unwrap();
        let to = Address::repeat_byte(0x42);
        node.submit(transfer(&node, 0, to)).unwrap();

        let event = node.emitter().tick().unwrap().expect("event");
        assert_eq!(event.txs().len(), 1);
        node.processor().wait_idle().unwrap();

        let block = node.store().block(1).unwrap().expect("block 1");
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(node.evm().balance(&to), U256::from(1_000u64));
        assert_eq!(node.world().consensus().committed(), 1);

        node.prune_pool(1).unwrap();
        assert!(node.selector().is_empty());
        clock.advance(2 * NANOS_PER_SEC);
        let next = node.emitter().tick().unwrap().expect("max interval");
        assert!(next.txs().is_empty());
    }

    #[test]
    fn test_single_proposer_block() {
        let clock = Arc::new(ManualClock::new(START));
        let node =
            Node::build_with_clock(config(UpgradeSet::SingleProposer), clock.clone()).unwrap();
        let to = Address::repeat_byte(0x43);
        node.submit(transfer(&node, 0, to)).unwrap();

        let event = node.emitter().tick().unwrap().expect("event");
        let proposal = event.payload().and_then(|p| p.proposal.as_ref()).expect("proposal");
        assert_eq!(proposal.number, 1);
        node.processor().wait_idle().unwrap();
        let block = node.store().block(1).unwrap().expect("block 1");
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(node.evm().balance(&to), U256::from(1_000u64));
    }

    #[test]
    fn test_restart_resumes_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(UpgradeSet::Sonic);
        cfg.data_dir = Some(dir.path().to_path_buf());
        let to = Address::repeat_byte(0x44);
        let clock = Arc::new(ManualClock::new(START));
        let last = {
            let node = Node::build_with_clock(cfg.clone(), clock.clone()).unwrap();
            node.submit(transfer(&node, 0, to)).unwrap();
            let e = node.emitter().tick().unwrap().unwrap();
            node.shutdown().unwrap();
            e
        };

        clock.advance(5 * NANOS_PER_SEC);
        let node = Node::build_with_clock(cfg, clock.clone()).unwrap();
        assert_eq!(node.store().block_state().last_block.idx, 1);
        assert_eq!(node.evm().balance(&to), U256::from(1_000u64), "state replayed");
        assert_eq!(node.evm().nonce(&fake_key(1).unwrap().address()), 1);

        let next = node.emitter().tick().unwrap().expect("resumed");
        assert_eq!(next.seq(), last.seq() + 1);
        assert_eq!(next.parents()[0], last.id());
    }

    #[test]
    fn test_locked_data_dir_refuses_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = NodeConfig::default();
        cfg.data_dir = Some(dir.path().to_path_buf());
        std::fs::write(dir.path().join(sn_07_emitter::ERROR_LOCK_FILE), "disk failure").unwrap();
        let err = Node::build(cfg).err().expect("locked");
        assert!(err.is_permanent());
    }

    #[test]
    fn test_non_validator_never_emits() {
        let mut cfg = NodeConfig::default();
        cfg.validator_id = 0;
        let node = Node::build(cfg).unwrap();
        assert!(node.emitter().tick().unwrap().is_none());
        assert_eq!(node.world().broadcasts(), 0);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let node = Arc::new(Node::build(NodeConfig::default()).unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let runner = {
            let node = Arc::clone(&node);
            tokio::spawn(async move {
                node.run(async {
                    let _ = rx.await;
                })
                .await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
        assert!(node.emitter().metrics().get_emitted() >= 1);
        assert!(!node.is_locked());
    }
}
