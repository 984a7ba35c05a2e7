//! # Store Service
//!
//! Typed access to everything block production persists. Hot values
//! (block state, epoch state, upgrade heights) are cached in [`Snapshot`]s
//! and written through.

use crate::domain::certification::BlockStatement;
use crate::domain::epoch_store::{EpochDbProducer, EpochStore};
use crate::domain::table::{be_key, Codec, Table};
use crate::error::Result;
use crate::ports::KeyValueStore;
use shared_types::{
    Block, BlockNumber, BlockState, EpochState, EventId, EventPayload, Hash, Receipt, Snapshot,
    TxPosition, UpgradeHeight,
};
use std::sync::Arc;
use tracing::debug;

const BLOCK_STATE_KEY: &[u8] = b"block_state";
const EPOCH_STATE_KEY: &[u8] = b"epoch_state";
const UPGRADE_HEIGHTS_KEY: &[u8] = b"upgrade_heights";

/// Persistent store of block production.
pub struct Store {
    kv: Arc<dyn KeyValueStore>,
    blocks: Table<Block>,
    block_hashes: Table<u64>,
    receipts: Table<Vec<Receipt>>,
    tx_positions: Table<TxPosition>,
    statements: Table<BlockStatement>,
    meta_block_state: Table<BlockState>,
    meta_epoch_state: Table<EpochState>,
    meta_upgrades: Table<Vec<UpgradeHeight>>,
    epoch_db: EpochStore,
    block_state: Snapshot<BlockState>,
    epoch_state: Snapshot<EpochState>,
    upgrade_heights: Snapshot<Vec<UpgradeHeight>>,
}

impl Store {
    /// Open over `kv`, loading cached state if present.
    pub fn open(kv: Arc<dyn KeyValueStore>, producer: Arc<dyn EpochDbProducer>) -> Result<Self> {
        let meta_block_state = Table::new(kv.clone(), b"m", "block_state");
        let meta_epoch_state = Table::new(kv.clone(), b"m", "epoch_state");
        let meta_upgrades = Table::new(kv.clone(), b"m", "upgrade_heights");

        let block_state: BlockState = meta_block_state.get(BLOCK_STATE_KEY)?.unwrap_or_default();
        let epoch_state: EpochState = meta_epoch_state.get(EPOCH_STATE_KEY)?.unwrap_or_default();
        let upgrades: Vec<UpgradeHeight> = meta_upgrades.get(UPGRADE_HEIGHTS_KEY)?.unwrap_or_default();
        let epoch_db = EpochStore::open(producer, epoch_state.epoch)?;

        Ok(Self {
            blocks: Table::new(kv.clone(), b"b", "blocks"),
            block_hashes: Table::new(kv.clone(), b"h", "block_hashes"),
            receipts: Table::new(kv.clone(), b"r", "receipts"),
            tx_positions: Table::new(kv.clone(), b"x", "tx_positions"),
            statements: Table::new(kv.clone(), b"c", "block_statements"),
            kv,
            meta_block_state,
            meta_epoch_state,
            meta_upgrades,
            epoch_db,
            block_state: Snapshot::new(block_state),
            epoch_state: Snapshot::new(epoch_state),
            upgrade_heights: Snapshot::new(upgrades),
        })
    }

    /// True once genesis has been applied.
    pub fn is_initialized(&self) -> Result<bool> {
        self.meta_epoch_state.get(EPOCH_STATE_KEY).map(|s| s.is_some())
    }

    /// Write the genesis block and initial states.
    pub fn apply_genesis(
        &self,
        genesis: &Block,
        block_state: BlockState,
        epoch_state: EpochState,
        upgrades: UpgradeHeight,
    ) -> Result<()> {
        self.write_block(genesis, &[])?;
        self.add_upgrade_height(upgrades)?;
        self.set_epoch_state(epoch_state)?;
        self.set_block_state(block_state)?;
        self.kv.flush()
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Write `block`, its hash index, its receipts and its tx positions in one
    /// batch.
    pub fn write_block(&self, block: &Block, positions: &[(Hash, TxPosition)]) -> Result<()> {
        let key = be_key(block.number);
        let mut ops = vec![
            self.blocks.put_op(&key, block),
            self.block_hashes.put_op(block.hash.as_bytes(), &block.number),
            self.receipts.put_op(&key, &block.receipts),
        ];
        ops.extend(
            positions
                .iter()
                .map(|(hash, pos)| self.tx_positions.put_op(hash.as_bytes(), pos)),
        );
        self.kv.write_batch(ops)?;
        debug!(number = block.number, txs = block.transactions.len(), "[sn-09] Block written");
        Ok(())
    }

    /// Block at `number`.
    pub fn block(&self, number: BlockNumber) -> Result<Option<Block>> {
        self.blocks.get(&be_key(number))
    }

    /// Block with `hash`.
    pub fn block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.block_hashes.get(hash.as_bytes())? {
            Some(n) => self.block(n),
            None => Ok(None),
        }
    }

    /// Hash of the block at `number`.
    pub fn block_hash(&self, number: BlockNumber) -> Result<Option<Hash>> {
        Ok(self.block(number)?.map(|b| b.hash))
    }

    /// Receipts of the block at `number`.
    pub fn receipts(&self, number: BlockNumber) -> Result<Option<Vec<Receipt>>> {
        self.receipts.get(&be_key(number))
    }

    /// Where a transaction was included.
    pub fn tx_position(&self, tx_hash: &Hash) -> Result<Option<TxPosition>> {
        self.tx_positions.get(tx_hash.as_bytes())
    }

    // =========================================================================
    // States
    // =========================================================================

    /// Current block state.
    pub fn block_state(&self) -> Arc<BlockState> {
        self.block_state.load()
    }

    /// Persist and publish `state`.
    pub fn set_block_state(&self, state: BlockState) -> Result<()> {
        self.meta_block_state.put(BLOCK_STATE_KEY, &state)?;
        self.block_state.store(state);
        Ok(())
    }

    /// Current epoch state.
    pub fn epoch_state(&self) -> Arc<EpochState> {
        self.epoch_state.load()
    }

    /// Persist and publish `state`, switching the epoch store on a new epoch.
    pub fn set_epoch_state(&self, state: EpochState) -> Result<()> {
        self.meta_epoch_state.put(EPOCH_STATE_KEY, &state)?;
        self.epoch_db.reset(state.epoch)?;
        self.epoch_state.store(state);
        Ok(())
    }

    /// Persist both states in one batch, switching the epoch store if needed.
    pub fn set_states(&self, block_state: BlockState, epoch_state: EpochState) -> Result<()> {
        self.kv.write_batch(vec![
            self.meta_block_state.put_op(BLOCK_STATE_KEY, &block_state),
            self.meta_epoch_state.put_op(EPOCH_STATE_KEY, &epoch_state),
        ])?;
        self.epoch_db.reset(epoch_state.epoch)?;
        self.epoch_state.store(epoch_state);
        self.block_state.store(block_state);
        Ok(())
    }

    // =========================================================================
    // Upgrade heights
    // =========================================================================

    /// Upgrade history, oldest first.
    pub fn upgrade_heights(&self) -> Arc<Vec<UpgradeHeight>> {
        self.upgrade_heights.load()
    }

    /// Append an entry to the upgrade history.
    pub fn add_upgrade_height(&self, height: UpgradeHeight) -> Result<()> {
        let mut next = (*self.upgrade_heights.load()).clone();
        next.push(height);
        self.meta_upgrades.put(UPGRADE_HEIGHTS_KEY, &next)?;
        self.upgrade_heights.store(next);
        Ok(())
    }

    // =========================================================================
    // Events (epoch scoped)
    // =========================================================================

    /// Store an event of the current epoch.
    pub fn set_event(&self, event: &EventPayload) -> Result<()> {
        self.epoch_db()
            .put(event.id().as_bytes(), &Codec::encode(event))
    }

    /// Event of the current epoch.
    pub fn event(&self, id: &EventId) -> Result<Option<EventPayload>> {
        match self.epoch_db().get(id.as_bytes())? {
            Some(bytes) => <EventPayload as Codec>::decode(&bytes)
                .map(Some)
                .map_err(|reason| crate::StoreError::Decode {
                    table: "events",
                    reason,
                }),
            None => Ok(None),
        }
    }

    /// True if the event is stored.
    pub fn has_event(&self, id: &EventId) -> Result<bool> {
        self.epoch_db().exists(id.as_bytes())
    }

    /// Every stored event of the current epoch in lamport order.
    pub fn events(&self) -> Result<Vec<EventPayload>> {
        self.epoch_db()
            .prefix_scan(&[])?
            .into_iter()
            .map(|(_, bytes)| {
                <EventPayload as Codec>::decode(&bytes).map_err(|reason| {
                    crate::StoreError::Decode {
                        table: "events",
                        reason,
                    }
                })
            })
            .collect()
    }

    /// Database of the current epoch.
    pub fn epoch_db(&self) -> Arc<dyn KeyValueStore> {
        self.epoch_db.db()
    }

    // =========================================================================
    // Certification
    // =========================================================================

    /// Record a block statement.
    pub fn set_block_statement(&self, statement: &BlockStatement) -> Result<()> {
        self.statements.put(&be_key(statement.number), statement)
    }

    /// Statements from `from` on, in height order.
    pub fn block_statements_from(&self, from: BlockNumber) -> Result<Vec<BlockStatement>> {
        Ok(self
            .statements
            .scan_from(&be_key(from))?
            .into_iter()
            .map(|(_, s)| s)
            .collect())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush to durable storage.
    pub fn flush(&self) -> Result<()> {
        self.kv.flush()
    }

    /// Close the store.
    pub fn close(&self) {
        self.epoch_db().close();
        self.kv.close();
    }
}
