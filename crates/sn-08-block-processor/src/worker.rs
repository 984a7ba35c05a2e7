//! # Block Worker
//!
//! Executes user transactions, writes the block and publishes the chain
//! head off the consensus thread. The queue holds a single job, so the
//! consensus thread runs at most one block ahead of execution.
//!
//! ```text
//!  end_block ──▶ [ sync_channel(1) ] ──▶ block-worker ──▶ store, feed
//!      ▲                                      │
//!      └──────────── wait_idle ◀── Condvar ───┘
//! ```

use crate::domain::{apply_driver_logs, PlacedTx, TxOrigin, INTERNAL_SENDER};
use crate::error::{BlockError, Result};
use crate::feed::{ChainHeadFeed, ChainHeadNotify};
use crate::metrics::BlockMetrics;
use crate::ports::{EvmProcessor, TxOutcome};
use parking_lot::{Condvar, Mutex};
use shared_types::{
    BlockBuilder, BlockCtx, Epoch, Gas, Hash, Log, Receipt, Transaction, TxPosition, UnixNanos,
    U256,
};
use sn_09_store::{BlockStatement, Store};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// A transaction that made it into the block.
pub(crate) struct ExecutedTx {
    pub tx: Transaction,
    pub receipt: Receipt,
    pub origin: TxOrigin,
}

/// Run an internal transaction. Failures are logged and never abort the
/// block.
pub(crate) fn execute_internal(
    processor: &mut dyn EvmProcessor,
    tx: Transaction,
    metrics: &BlockMetrics,
) -> Option<ExecutedTx> {
    match processor.execute(&tx, INTERNAL_SENDER, true) {
        TxOutcome::Executed(receipt) => {
            if !receipt.succeeded() {
                warn!(tx = ?tx.hash(), "[sn-08] ⚠️ Internal transaction reverted");
                metrics.record_internal_revert();
            }
            Some(ExecutedTx {
                tx,
                receipt,
                origin: TxOrigin {
                    event: Default::default(),
                    event_offset: 0,
                    creator: 0,
                },
            })
        }
        TxOutcome::Skipped(reason) => {
            warn!(tx = ?tx.hash(), ?reason, "[sn-08] ⚠️ Internal transaction skipped");
            metrics.record_internal_revert();
            None
        }
    }
}

/// Second half of a block, run on the worker thread.
pub(crate) struct BlockJob {
    pub block: BlockCtx,
    pub epoch: Epoch,
    pub parent_hash: Hash,
    pub parent_time: UnixNanos,
    pub gas_limit: Gas,
    pub base_fee: U256,
    pub prev_randao: Hash,
    pub processor: Box<dyn EvmProcessor>,
    /// Pre-internal transactions, already executed.
    pub executed: Vec<ExecutedTx>,
    pub txs: Vec<PlacedTx>,
    pub post_internal: Vec<Transaction>,
}

/// What the worker writes to.
pub(crate) struct WorkerContext {
    pub store: Arc<Store>,
    pub metrics: Arc<BlockMetrics>,
    pub feed: Arc<ChainHeadFeed>,
}

impl BlockJob {
    fn run(self, ctx: &WorkerContext) -> Result<()> {
        let BlockJob {
            block,
            epoch,
            parent_hash,
            parent_time,
            gas_limit,
            base_fee,
            prev_randao,
            mut processor,
            mut executed,
            txs,
            post_internal,
        } = self;

        let applied_logs = executed.len();
        let mut skipped = 0usize;
        for placed in txs {
            match processor.execute(&placed.tx, placed.sender, false) {
                TxOutcome::Executed(receipt) => executed.push(ExecutedTx {
                    tx: placed.tx,
                    receipt,
                    origin: placed.origin,
                }),
                TxOutcome::Skipped(reason) => {
                    debug!(tx = ?placed.tx.hash(), ?reason, "[sn-08] Transaction skipped");
                    skipped += 1;
                }
            }
        }
        for tx in post_internal {
            executed.extend(execute_internal(processor.as_mut(), tx, &ctx.metrics));
        }
        let state_root = processor.commit();

        let mut builder = BlockBuilder::new(block.idx)
            .with_epoch(epoch)
            .with_parent_hash(parent_hash)
            .with_time(block.time, parent_time)
            .with_gas_limit(gas_limit)
            .with_base_fee(base_fee)
            .with_prev_randao(prev_randao)
            .with_state_root(state_root);
        let mut positions = Vec::with_capacity(executed.len());
        for (offset, e) in executed.into_iter().enumerate() {
            positions.push((
                e.tx.hash(),
                TxPosition {
                    block: block.idx,
                    block_offset: offset as u32,
                    event: e.origin.event,
                    event_offset: e.origin.event_offset,
                    event_creator: e.origin.creator,
                },
            ));
            builder.add_transaction(e.tx, e.receipt);
        }
        let built = builder.build();
        ctx.store.write_block(&built, &positions)?;

        // Pre-internal logs were folded in before sealing.
        let logs: Vec<Log> = built
            .receipts
            .iter()
            .skip(applied_logs)
            .flat_map(|r| r.logs.iter().cloned())
            .collect();
        let es = ctx.store.epoch_state();
        let mut bs = (*ctx.store.block_state()).clone();
        apply_driver_logs(&logs, &mut bs, &es);
        bs.last_block_hash = built.hash;
        bs.finalized_state_root = state_root;
        bs.epoch_gas = bs.epoch_gas.saturating_add(built.gas_used);
        ctx.store.set_block_state(bs)?;
        ctx.store.set_block_statement(&BlockStatement::of(&built))?;

        let txs = built.transactions.len();
        ctx.metrics.record_block(txs, skipped, built.gas_used);
        info!(
            number = built.number,
            txs,
            skipped,
            gas_used = built.gas_used,
            hash = ?built.hash,
            "[sn-08] 📦 Block produced"
        );
        ctx.feed.publish(ChainHeadNotify::new(built));
        Ok(())
    }
}

#[derive(Default)]
struct Progress {
    submitted: u64,
    completed: u64,
    failure: Option<String>,
}

struct Shared {
    progress: Mutex<Progress>,
    idle: Condvar,
}

/// Single background thread executing [`BlockJob`]s in submission order.
pub(crate) struct BlockWorker {
    sender: Mutex<Option<SyncSender<BlockJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl BlockWorker {
    pub fn spawn(ctx: WorkerContext) -> Result<Self> {
        let (tx, rx) = sync_channel::<BlockJob>(1);
        let shared = Arc::new(Shared {
            progress: Mutex::new(Progress::default()),
            idle: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("block-worker".into())
            .spawn(move || work(rx, ctx, worker_shared))
            .map_err(|e| BlockError::Worker(e.to_string()))?;
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            shared,
        })
    }

    /// Queue `job`; blocks while the previous job is still queued.
    pub fn submit(&self, job: BlockJob) -> Result<()> {
        let tx = self
            .sender
            .lock()
            .as_ref()
            .cloned()
            .ok_or(BlockError::Terminated)?;
        self.shared.progress.lock().submitted += 1;
        tx.send(job).map_err(|_| {
            self.shared.progress.lock().submitted -= 1;
            BlockError::Terminated
        })
    }

    /// Wait until every submitted job finished. Fails if any job failed.
    pub fn wait_idle(&self) -> Result<()> {
        let mut progress = self.shared.progress.lock();
        while progress.completed < progress.submitted {
            self.shared.idle.wait(&mut progress);
        }
        match &progress.failure {
            Some(reason) => Err(BlockError::Worker(reason.clone())),
            None => Ok(()),
        }
    }

    /// Drain the queue and join the thread.
    pub fn stop(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
            debug!("[sn-08] Block worker stopped");
        }
    }
}

impl Drop for BlockWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn work(rx: Receiver<BlockJob>, ctx: WorkerContext, shared: Arc<Shared>) {
    while let Ok(job) = rx.recv() {
        let number = job.block.idx;
        let failure = match catch_unwind(AssertUnwindSafe(|| job.run(&ctx))) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("panic while producing block {number}")),
        };
        let mut progress = shared.progress.lock();
        if let Some(reason) = failure {
            error!(number, error = %reason, "[sn-08] ❌ Block production failed");
            progress.failure.get_or_insert(reason);
        }
        progress.completed += 1;
        shared.idle.notify_all();
    }
}
