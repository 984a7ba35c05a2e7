//! Shared chain fixtures: a block processor over an in-memory store and the
//! transfer EVM, fed with hand-built consensus blocks.

use shared_crypto::{Secp256k1KeyPair, SenderCache, TxSigner};
use shared_types::{
    Address, Block, BlockNumber, Epoch, EventHeader, EventPayload, EventSignature, Gas, Hash,
    MutableEventPayload, Rules, Transaction, TxType, ValidatorId, ValidatorProfile,
    ValidatorProfiles, Validators, EVENT_VERSION_2, GWEI, NANOS_PER_SEC, U256,
};
use sn_08_block_processor::{
    apply_genesis, BlockMetrics, BlockProcessor, BlockProcessorConfig, ConsensusBlock,
    StateReader, TransferEvm,
};
use sn_09_store::{MemoryProducer, MemoryStore, Store};
use std::sync::Arc;

/// Chain id of the fake network.
pub const CHAIN_ID: u64 = 0xfa3;

/// Genesis timestamp shared by every fixture chain.
pub const GENESIS_TIME: u64 = 1_000 * NANOS_PER_SEC;

/// Deterministic key for `seed`.
pub fn key(seed: u8) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([seed; 32]).unwrap()
}

/// Profiles for validators `1..=keys.len()` with the given weights.
pub fn profiles(keys: &[Secp256k1KeyPair], weights: &[u64]) -> ValidatorProfiles {
    let mut profiles = ValidatorProfiles::new();
    for (i, (key, weight)) in keys.iter().zip(weights).enumerate() {
        profiles.insert(
            i as ValidatorId + 1,
            ValidatorProfile {
                weight: U256::from(*weight),
                pubkey: key.validator_pubkey().as_bytes().to_vec(),
            },
        );
    }
    profiles
}

/// Dynamic-fee transaction signed by `from`.
pub fn signed(
    from: &Secp256k1KeyPair,
    nonce: u64,
    to: Address,
    value: U256,
    data: Vec<u8>,
    gas: Gas,
    fee_cap_gwei: u64,
) -> Transaction {
    let tx = Transaction {
        tx_type: TxType::DynamicFee,
        nonce,
        gas,
        gas_fee_cap: U256::from(fee_cap_gwei) * U256::from(GWEI),
        to: Some(to),
        value,
        data,
        ..Default::default()
    };
    TxSigner::new(CHAIN_ID).sign(tx, from).unwrap()
}

/// One node: store, world state and block processor.
pub struct Chain {
    /// Chain and epoch databases.
    pub store: Arc<Store>,
    /// World state.
    pub evm: Arc<TransferEvm>,
    /// Block processor under test.
    pub processor: BlockProcessor,
    /// Genesis block.
    pub genesis: Block,
}

impl Chain {
    /// Chain started from `profiles` and `alloc`, with `owner` allowed to
    /// call the driver.
    pub fn new(
        rules: Rules,
        profiles: ValidatorProfiles,
        alloc: &[(Address, U256)],
        owner: Option<Address>,
    ) -> Self {
        let evm = Arc::new(TransferEvm::new(alloc.iter().copied(), owner));
        let store = Arc::new(
            Store::open(Arc::new(MemoryStore::new()), Arc::new(MemoryProducer)).unwrap(),
        );
        let genesis =
            apply_genesis(&store, evm.state_root(), profiles, rules, GENESIS_TIME).unwrap();
        let processor = BlockProcessor::new(
            BlockProcessorConfig::default(),
            Arc::clone(&store),
            evm.clone(),
            Arc::new(SenderCache::new(TxSigner::new(CHAIN_ID), 4096)),
            Arc::new(BlockMetrics::default()),
        )
        .unwrap();
        Self {
            store,
            evm,
            processor,
            genesis,
        }
    }

    /// Decide a consensus block with the last event as Atropos and wait for
    /// the block to be written. Returns the new validators on epoch seal.
    pub fn commit(&self, events: &[Arc<EventPayload>]) -> Option<Validators> {
        let atropos = events.last().map(|e| e.id()).unwrap_or_default();
        let mut assembly = self.processor.begin_block(ConsensusBlock {
            atropos,
            cheaters: Vec::new(),
        });
        for event in events {
            assembly.apply_event(Arc::clone(event));
        }
        let sealed = assembly.end_block().unwrap();
        self.processor.wait_idle().unwrap();
        sealed
    }

    /// Block at `number`, if written.
    pub fn block(&self, number: BlockNumber) -> Option<Block> {
        self.store.block(number).unwrap()
    }

    /// Height and hash of the latest block.
    pub fn head(&self) -> (BlockNumber, Hash) {
        let bs = self.store.block_state();
        (bs.last_block.idx, bs.last_block_hash)
    }
}

/// Builds classic (version 2) events with increasing lamport times.
#[derive(Default)]
pub struct EventFactory {
    lamport: u32,
}

impl EventFactory {
    /// Event of `creator` in `epoch`, created `secs` after genesis.
    pub fn event(
        &mut self,
        epoch: Epoch,
        creator: ValidatorId,
        secs: u64,
        txs: Vec<Transaction>,
    ) -> Arc<EventPayload> {
        self.lamport += 1;
        let time = GENESIS_TIME + secs * NANOS_PER_SEC;
        let mut m = MutableEventPayload {
            header: EventHeader {
                version: EVENT_VERSION_2,
                epoch,
                seq: self.lamport,
                frame: self.lamport,
                lamport: self.lamport,
                creator,
                creation_time: time,
                median_time: time,
                ..Default::default()
            },
            txs,
            ..Default::default()
        };
        m.header.payload_hash = m.compute_payload_hash();
        Arc::new(m.build(EventSignature([0u8; 64])))
    }
}
