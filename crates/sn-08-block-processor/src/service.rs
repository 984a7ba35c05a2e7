//! # Block Processor Service
//!
//! The consensus engine opens a [`BlockAssembly`] per finalized consensus
//! block, feeds it the confirmed events in commit order and closes it with
//! [`BlockAssembly::end_block`].
//!
//! The consensus thread decides the block content, runs the pre-internal
//! transactions and seals the epoch; user transactions run on the block
//! worker. `end_block` first waits for the previous block to finish, so
//! every decision reads fully settled state.

use crate::adapters::{DriverTransactor, TargetRateBaseFee};
use crate::config::BlockProcessorConfig;
use crate::domain::{
    apply_driver_logs, block_time, legacy_transactions, proposal_transactions, seal_epoch,
    should_seal, should_skip, spill_events, SkipInputs,
};
use crate::error::{BlockError, Result};
use crate::feed::ChainHeadFeed;
use crate::metrics::BlockMetrics;
use crate::ports::{
    BaseFeeCalculator, ConfirmedEventListener, Evm, EvmBlockContext, InternalCtx,
    InternalTransactor, ParentFeeInfo,
};
use crate::worker::{execute_internal, BlockJob, BlockWorker, WorkerContext};
use parking_lot::RwLock;
use shared_crypto::{SenderCache, ValidatorPubKey};
use shared_types::{
    BlockCtx, BlockState, ChainConfig, EventId, EventPayload, Log, UnixNanos, ValidatorEventInfo,
    ValidatorId, Validators,
};
use sn_01_randao::prev_randao;
use sn_05_proposer::{select_proposal, ProposalCandidate};
use sn_09_store::Store;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A finalized consensus block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsensusBlock {
    /// Event that finalized the block.
    pub atropos: EventId,
    /// Validators caught forking, as reported by consensus.
    pub cheaters: Vec<ValidatorId>,
}

/// Turns consensus blocks into chain blocks.
pub struct BlockProcessor {
    config: BlockProcessorConfig,
    store: Arc<Store>,
    evm: Arc<dyn Evm>,
    senders: Arc<SenderCache>,
    base_fee: Arc<dyn BaseFeeCalculator>,
    transactor: Arc<dyn InternalTransactor>,
    listeners: RwLock<Vec<Arc<dyn ConfirmedEventListener>>>,
    feed: Arc<ChainHeadFeed>,
    metrics: Arc<BlockMetrics>,
    bootstrapping: AtomicBool,
    worker: BlockWorker,
}

impl BlockProcessor {
    /// Processor on top of the chain in `store`. Starts the block worker.
    pub fn new(
        config: BlockProcessorConfig,
        store: Arc<Store>,
        evm: Arc<dyn Evm>,
        senders: Arc<SenderCache>,
        metrics: Arc<BlockMetrics>,
    ) -> Result<Self> {
        let head = store.block_state().last_block.idx;
        let feed = Arc::new(ChainHeadFeed::new(config.feed_capacity, head + 1));
        let worker = BlockWorker::spawn(WorkerContext {
            store: Arc::clone(&store),
            metrics: Arc::clone(&metrics),
            feed: Arc::clone(&feed),
        })?;
        info!(head, "[sn-08] 🏗️ Block processor started");
        Ok(Self {
            base_fee: Arc::new(TargetRateBaseFee::new(
                config.target_gas_rate,
                config.base_fee_change_denominator,
            )),
            transactor: Arc::new(DriverTransactor::new(config.internal_tx_gas)),
            config,
            store,
            evm,
            senders,
            listeners: RwLock::new(Vec::new()),
            feed,
            metrics,
            bootstrapping: AtomicBool::new(false),
            worker,
        })
    }

    /// Replace the base fee calculator.
    pub fn with_base_fee(mut self, base_fee: Arc<dyn BaseFeeCalculator>) -> Self {
        self.base_fee = base_fee;
        self
    }

    /// Replace the internal transaction source.
    pub fn with_transactor(mut self, transactor: Arc<dyn InternalTransactor>) -> Self {
        self.transactor = transactor;
        self
    }

    /// Notify `listener` of every confirmed event.
    pub fn subscribe(&self, listener: Arc<dyn ConfirmedEventListener>) {
        self.listeners.write().push(listener);
    }

    /// Chain head feed.
    pub fn feed(&self) -> &Arc<ChainHeadFeed> {
        &self.feed
    }

    /// Metrics handle.
    pub fn metrics(&self) -> &Arc<BlockMetrics> {
        &self.metrics
    }

    /// Configuration in use.
    pub fn config(&self) -> &BlockProcessorConfig {
        &self.config
    }

    /// While bootstrapping, consensus blocks replay without producing blocks.
    pub fn set_bootstrapping(&self, bootstrapping: bool) {
        self.bootstrapping.store(bootstrapping, Ordering::Release);
    }

    /// Open a consensus block.
    pub fn begin_block(&self, block: ConsensusBlock) -> BlockAssembly<'_> {
        debug!(atropos = ?block.atropos, cheaters = block.cheaters.len(), "[sn-08] Consensus block");
        BlockAssembly {
            processor: self,
            block,
            events: Vec::new(),
            confirmed: Vec::new(),
            last_events: BTreeMap::new(),
            atropos_time: None,
        }
    }

    /// Wait for the block worker to finish every queued block.
    pub fn wait_idle(&self) -> Result<()> {
        self.worker.wait_idle()
    }

    /// Finish queued blocks and stop the worker.
    pub fn stop(&self) {
        self.worker.stop();
        info!("[sn-08] 🛑 Block processor stopped");
    }
}

/// Events of one consensus block being collected.
pub struct BlockAssembly<'a> {
    processor: &'a BlockProcessor,
    block: ConsensusBlock,
    events: Vec<Arc<EventPayload>>,
    confirmed: Vec<EventId>,
    last_events: BTreeMap<ValidatorId, (u32, ValidatorEventInfo)>,
    atropos_time: Option<UnixNanos>,
}

impl BlockAssembly<'_> {
    /// Record a confirmed event. Events arrive in commit order.
    pub fn apply_event(&mut self, event: Arc<EventPayload>) {
        let id = event.id();
        let header = event.header();
        if id == self.block.atropos {
            self.atropos_time = Some(header.median_time);
        }
        self.confirmed.push(id);

        let info = ValidatorEventInfo {
            id,
            time: header.median_time,
            gas_power_left: header.gas_power_left,
        };
        let latest = self
            .last_events
            .entry(event.creator())
            .or_insert((event.seq(), info));
        if event.seq() >= latest.0 {
            *latest = (event.seq(), info);
        }

        for listener in self.processor.listeners.read().iter() {
            listener.on_event_confirmed(&event);
        }
        if event.has_txs_or_proposal() {
            self.events.push(event);
        }
    }

    /// Close the consensus block. Returns the new validator set when the
    /// block sealed the epoch.
    #[instrument(skip(self), fields(atropos = ?self.block.atropos))]
    pub fn end_block(self) -> Result<Option<Validators>> {
        let p = self.processor;
        if p.bootstrapping.load(Ordering::Acquire) {
            return Ok(None);
        }
        p.worker.wait_idle()?;

        let es = p.store.epoch_state();
        let mut bs = (*p.store.block_state()).clone();
        bs.merge_cheaters(&self.block.cheaters);

        let mut events = self.events;
        events.sort_by_key(|e| (e.lamport(), e.id()));

        let rules = &es.rules;
        let single_proposer = rules.upgrades.single_proposer_block_formation;
        let proposal = if single_proposer {
            select_proposal(
                events.iter().filter_map(|e| {
                    let payload = e.payload()?;
                    Some(ProposalCandidate {
                        turn: payload.proposal_sync_state.last_seen_proposal_turn,
                        proposer: e.creator(),
                        proposal: payload.proposal.as_ref()?,
                    })
                }),
                bs.last_block.idx,
                &bs.last_block_hash,
            )
        } else {
            None
        };

        let atropos_time = self
            .atropos_time
            .or_else(|| events.iter().map(|e| e.header().median_time).max())
            .unwrap_or(bs.last_block.time);
        let candidate_time = proposal.map_or(atropos_time, |c| c.proposal.time);
        let skip = should_skip(&SkipInputs {
            atropos_reused: self.block.atropos == bs.last_block.atropos,
            empty: if single_proposer {
                proposal.is_none()
            } else {
                events.is_empty()
            },
            has_cheaters: !self.block.cheaters.is_empty(),
            time: candidate_time,
            last_block_time: bs.last_block.time,
            skip_period: rules.blocks.max_empty_block_skip_period,
        });

        if skip {
            record_last_events(&mut bs, &es.validators, &self.last_events, None);
            p.store.set_block_state(bs)?;
            p.metrics.record_skip();
            debug!("[sn-08] Consensus block skipped");
            return Ok(None);
        }

        let parent_idx = bs.last_block.idx;
        let parent = p
            .store
            .block(parent_idx)?
            .ok_or(BlockError::MissingParent(parent_idx))?;
        let block = BlockCtx {
            idx: parent_idx + 1,
            time: block_time(candidate_time, parent.time),
            atropos: self.block.atropos,
        };
        record_last_events(&mut bs, &es.validators, &self.last_events, Some(block.idx));
        let sealing = should_seal(&bs, &es, block.time);

        let reveal = proposal.and_then(|c| {
            let pubkey = ValidatorPubKey::from_bytes(es.pubkey(c.proposer)?).ok()?;
            Some((c.proposal.randao_reveal, pubkey))
        });
        let randao = prev_randao(
            reveal.as_ref().map(|(r, k)| (r, k)),
            &bs.prev_randao,
            &self.confirmed,
        );

        let txs = match proposal {
            Some(c) => {
                let carrier = events
                    .iter()
                    .find(|e| {
                        e.payload()
                            .and_then(|p| p.proposal.as_ref())
                            .is_some_and(|pr| std::ptr::eq(pr, c.proposal))
                    })
                    .map(Arc::clone);
                match carrier {
                    Some(carrier) => {
                        proposal_transactions(&carrier, &c.proposal.transactions, &p.senders)
                    }
                    None => Vec::new(),
                }
            }
            None if single_proposer => Vec::new(),
            None => {
                let (kept, spilled) = spill_events(events.clone(), rules.blocks.max_block_gas);
                if spilled > 0 {
                    debug!(spilled, "[sn-08] Events spilled past the block gas ceiling");
                    p.metrics.record_spilled(spilled);
                }
                legacy_transactions(&kept, &p.senders, block.idx, rules.upgrades.brio)
            }
        };

        let base_fee = p.base_fee.next_base_fee(
            &ParentFeeInfo {
                base_fee: parent.base_fee,
                gas_used: parent.gas_used,
                duration: parent.duration,
            },
            rules,
        );
        let chain = ChainConfig::materialize(rules.network_id, &p.store.upgrade_heights());
        let mut processor = p.evm.begin(EvmBlockContext {
            number: block.idx,
            time: block.time,
            prev_randao: randao,
            base_fee,
            gas_limit: rules.blocks.max_block_gas,
            chain,
            rules: rules.clone(),
        });

        let internal = InternalCtx {
            block: &block,
            sealing,
            block_state: &bs,
            epoch_state: &es,
        };
        let pre_internal = p.transactor.pre_internal(&internal);
        let post_internal = p.transactor.post_internal(&internal);
        let executed: Vec<_> = pre_internal
            .into_iter()
            .filter_map(|tx| execute_internal(processor.as_mut(), tx, &p.metrics))
            .collect();
        let pre_logs: Vec<Log> = executed
            .iter()
            .flat_map(|e| e.receipt.logs.iter().cloned())
            .collect();
        apply_driver_logs(&pre_logs, &mut bs, &es);

        bs.last_block = block;
        bs.prev_randao = randao;
        bs.base_fee = base_fee;

        let mut epoch = es.epoch;
        let new_validators = if sealing {
            let outcome = seal_epoch(&mut bs, &es, &block)?;
            if let Some(height) = outcome.upgrade_height {
                info!(
                    height = height.height,
                    upgrades = ?height.upgrades,
                    "[sn-08] ⬆️ Upgrades activated"
                );
                p.store.add_upgrade_height(height)?;
            }
            let next = outcome.epoch_state;
            epoch = next.epoch;
            let validators = next.validators.clone();
            info!(
                epoch = next.epoch,
                block = block.idx,
                validators = validators.len(),
                "[sn-08] 🔒 Epoch sealed"
            );
            p.store.set_states(bs, next)?;
            p.metrics.record_seal();
            Some(validators)
        } else {
            p.store.set_block_state(bs)?;
            None
        };

        p.worker.submit(BlockJob {
            block,
            epoch,
            parent_hash: parent.hash,
            parent_time: parent.time,
            gas_limit: rules.blocks.max_block_gas,
            base_fee,
            prev_randao: randao,
            processor,
            executed,
            txs,
            post_internal,
        })?;
        Ok(new_validators)
    }
}

fn record_last_events(
    bs: &mut BlockState,
    validators: &Validators,
    last_events: &BTreeMap<ValidatorId, (u32, ValidatorEventInfo)>,
    block: Option<u64>,
) {
    if bs.validator_states.len() < validators.len() {
        bs.validator_states.resize(validators.len(), Default::default());
    }
    for (creator, (_, info)) in last_events {
        let Some(idx) = validators.get_idx(*creator) else {
            warn!(creator, "[sn-08] ⚠️ Confirmed event from a non-validator");
            continue;
        };
        let state = &mut bs.validator_states[idx];
        state.last_event = *info;
        state.last_online_time = info.time;
        if let Some(number) = block {
            state.last_block = number;
        }
    }
}
