//! # Emitter Service
//!
//! One [`Emitter`] per validator. Each tick decides whether an event is due,
//! composes it on top of the indexed DAG, signs it and hands it to the node.
//! Connected events come back through [`Emitter::on_event_connected`],
//! confirmed ones through [`ConfirmedEventListener`].
//!
//! ```text
//!  tick ──▶ error lock ──▶ sync checks ──▶ pacing ──▶ parents ──▶ payload
//!                                                                  │
//!  broadcast ◀── prev-emitted ◀── World::process ◀── sign ◀── gas fit
//! ```

use crate::config::EmitterConfig;
use crate::domain::{
    build_proposal, challenge_deadline, confirming_intervals, detect_parallel_instance,
    emitter_interval_limit, fit_gas, jittered, median_time, proposal_size_limit, synced_to_emit,
    turn_seed, tx_turn, version_extra, wants_proposal, ErrorLock, Pacing, PrevEmitted, SyncStatus,
};
use crate::error::{EmitterError, Result};
use crate::metrics::EmitterMetrics;
use crate::ports::{Clock, LatestBlock, World};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_crypto::ValidatorSigner;
use shared_types::{
    Epoch, EpochState, EventHeader, EventId, EventPayload, EventSignature, Hash,
    MutableEventPayload, Payload, ProposalSyncState, Rules, Seq, Transaction, UnixNanos,
    ValidatorId, EVENT_VERSION_3, NANOS_PER_MILLI,
};
use sn_03_event_check::{calc_frame, calc_gas_power};
use sn_04_ancestor::{AncestorIndex, Metric, ProgressMetric};
use sn_05_proposer::{advance, incoming_state, is_allowed_to_propose};
use sn_06_tx_selector::{SelectionLimits, TxSelector};
use sn_08_block_processor::ConfirmedEventListener;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Offline challenges are re-evaluated at most this often.
const CHALLENGE_RECHECK: UnixNanos = 500 * NANOS_PER_MILLI;

struct EmitterState {
    epoch: Epoch,
    index: AncestorIndex,
    prev_emitted: PrevEmitted,
    /// Highest own seq known in `epoch`.
    own_seq: Seq,
    /// Own event between composition and connection.
    emitting: Option<EventId>,
    /// Event from the prev-emitted file not connected yet.
    awaiting_own: Option<EventId>,
    version_sent: bool,
    external_created: Option<UnixNanos>,
    external_detected: Option<UnixNanos>,
    parallel: Option<EventId>,
    challenges: BTreeMap<ValidatorId, UnixNanos>,
    offline: BTreeSet<ValidatorId>,
    expected: BTreeMap<ValidatorId, Duration>,
    last_recheck: UnixNanos,
    last_confirmation: UnixNanos,
    to_confirm: HashSet<EventId>,
    originated: HashMap<Hash, EventId>,
}

struct Composed {
    event: EventPayload,
    proposal: bool,
}

/// Event emitter of one validator.
pub struct Emitter {
    config: EmitterConfig,
    world: Arc<dyn World>,
    signer: Arc<dyn ValidatorSigner>,
    selector: Arc<TxSelector>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EmitterMetrics>,
    error_lock: Arc<ErrorLock>,
    state: Mutex<EmitterState>,
    emit_lock: Mutex<()>,
    rng: Mutex<StdRng>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

fn progress_metric(rules: &Rules) -> ProgressMetric {
    if rules.upgrades.allegro {
        ProgressMetric::StronglyReach
    } else {
        ProgressMetric::ForklessCause
    }
}

fn proposal_txs(event: &EventPayload) -> &[Transaction] {
    event
        .payload()
        .and_then(|p| p.proposal.as_ref())
        .map(|p| p.transactions.as_slice())
        .unwrap_or(&[])
}

impl Emitter {
    /// Create the emitter.
    ///
    /// Refuses to start while `error_lock` holds a reason. The DAG of the
    /// current epoch must be replayed through [`Self::on_event_connected`]
    /// before the first tick.
    pub fn new(
        config: EmitterConfig,
        world: Arc<dyn World>,
        signer: Arc<dyn ValidatorSigner>,
        selector: Arc<TxSelector>,
        clock: Arc<dyn Clock>,
        error_lock: Arc<ErrorLock>,
    ) -> Result<Self> {
        error_lock.check()?;
        let prev_emitted = match &config.data_dir {
            Some(dir) => PrevEmitted::load(dir)?,
            None => PrevEmitted::in_memory(),
        };
        let es = world.epoch_state();
        let now = clock.now();
        let offline = BTreeSet::new();
        let mut state = EmitterState {
            epoch: es.epoch,
            index: AncestorIndex::new(
                &config.ancestor,
                es.validators.clone(),
                config.validator,
                progress_metric(&es.rules),
            ),
            prev_emitted,
            own_seq: 0,
            emitting: None,
            awaiting_own: None,
            version_sent: false,
            external_created: None,
            external_detected: None,
            parallel: None,
            challenges: BTreeMap::new(),
            expected: confirming_intervals(&es.validators, &offline, config.intervals.confirming),
            offline,
            last_recheck: now,
            last_confirmation: now,
            to_confirm: HashSet::new(),
            originated: HashMap::new(),
        };
        if config.validator != 0 {
            restart_check(&config, world.as_ref(), &mut state, now);
        }
        info!(
            validator = config.validator,
            epoch = es.epoch,
            "[sn-07] ⚙️ Emitter ready"
        );
        Ok(Self {
            metrics: Arc::new(EmitterMetrics::new(config.tx_time_cache_size)),
            config,
            world,
            signer,
            selector,
            clock,
            error_lock,
            state: Mutex::new(state),
            emit_lock: Mutex::new(()),
            rng: Mutex::new(StdRng::from_entropy()),
            shutdown_tx: Mutex::new(None),
        })
    }

    /// Shared metrics.
    pub fn metrics(&self) -> Arc<EmitterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Validator this emitter signs for.
    pub fn validator(&self) -> ValidatorId {
        self.config.validator
    }

    /// Remember when a transaction entered the local pool.
    pub fn note_tx(&self, hash: Hash) {
        self.metrics.record_tx_seen(hash, self.clock.now());
    }

    /// Index a connected event. Every event of the epoch, own ones
    /// included, must pass through here in connection order.
    pub fn on_event_connected(&self, event: &EventPayload) {
        let now = self.clock.now();
        let mut st = self.state.lock();
        if event.epoch() != st.epoch {
            let es = self.world.epoch_state();
            if event.epoch() != es.epoch {
                return;
            }
            self.start_epoch(&mut st, &es, now);
        }
        let weight = event.txs().len() + proposal_txs(event).len();
        if let Err(err) = st.index.add_event(event.header(), weight as Metric) {
            debug!(event = %event.id(), error = %err, "[sn-07] Event not indexed");
            return;
        }

        let creator = event.creator();
        if creator == self.config.validator {
            self.on_own_event(&mut st, event, now);
        } else {
            if st.offline.remove(&creator) {
                debug!(validator = creator, "[sn-07] 📶 Validator back online");
                recount(&mut st, self.config.intervals.confirming);
            }
            let expected = st
                .expected
                .get(&creator)
                .copied()
                .unwrap_or(self.config.intervals.confirming);
            st.challenges.insert(creator, challenge_deadline(now, expected));
        }

        if event.has_txs_or_proposal() {
            st.to_confirm.insert(event.id());
        }
        for tx in event.txs() {
            st.originated.insert(tx.hash(), event.id());
        }
    }

    fn on_own_event(&self, st: &mut EmitterState, event: &EventPayload, now: UnixNanos) {
        let id = event.id();
        let known = match st.awaiting_own {
            Some(awaited) if awaited == id => {
                info!(event = %id, "[sn-07] ✅ Last emitted event connected, resuming");
                st.awaiting_own = None;
                true
            }
            Some(awaited) => event.lamport() < awaited.lamport(),
            None => false,
        };
        if !known && st.emitting != Some(id) && event.seq() > st.own_seq {
            st.external_created = Some(event.header().creation_time);
            st.external_detected = Some(now);
            let status = self.sync_status(st, now);
            if detect_parallel_instance(&status, self.config.intervals.parallel_instance_protection)
            {
                let err = EmitterError::ParallelInstance {
                    event: id,
                    validator: self.config.validator,
                };
                self.error_lock.permanent(&err);
                st.parallel = Some(id);
            } else {
                warn!(
                    event = %id,
                    seq = event.seq(),
                    "[sn-07] ⚠️ Own event created elsewhere, pausing emission"
                );
            }
        }
        st.own_seq = st.own_seq.max(event.seq());
    }

    fn start_epoch(&self, st: &mut EmitterState, es: &EpochState, now: UnixNanos) {
        info!(epoch = es.epoch, "[sn-07] 🔄 New epoch");
        st.index
            .reset(es.validators.clone(), progress_metric(&es.rules));
        st.epoch = es.epoch;
        st.own_seq = 0;
        st.emitting = None;
        if st.awaiting_own.is_some_and(|id| id.epoch() != es.epoch) {
            st.awaiting_own = None;
        }
        st.challenges.clear();
        st.offline.clear();
        st.to_confirm.clear();
        st.originated.clear();
        st.last_recheck = now;
        recount(st, self.config.intervals.confirming);
    }

    fn sync_status(&self, st: &EmitterState, now: UnixNanos) -> SyncStatus {
        SyncStatus {
            now,
            peers: self.world.peer_count(),
            p2p_synced: self.world.is_synced(),
            external_self_event_created: st.external_created,
            external_self_event_detected: st.external_detected,
        }
    }

    fn recheck_challenges(&self, st: &mut EmitterState, now: UnixNanos) {
        if now.saturating_sub(st.last_recheck) < CHALLENGE_RECHECK {
            return;
        }
        st.last_recheck = now;
        let expired: Vec<ValidatorId> = st
            .challenges
            .iter()
            .filter(|(id, deadline)| now > **deadline && !st.offline.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        if expired.is_empty() {
            return;
        }
        for id in &expired {
            debug!(validator = *id, "[sn-07] 📴 Validator considered offline");
            st.offline.insert(*id);
        }
        recount(st, self.config.intervals.confirming);
    }

    /// Run one emission attempt, logging recoverable failures.
    ///
    /// Permanent errors lock the node and are returned.
    pub fn tick(&self) -> Result<Option<Arc<EventPayload>>> {
        match self.create_event() {
            Ok(event) => Ok(event),
            Err(err) if err.is_permanent() => {
                self.error_lock.permanent(&err);
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "[sn-07] ⚠️ Event not emitted");
                Ok(None)
            }
        }
    }

    /// Compose, sign and process an event if one is due.
    pub fn create_event(&self) -> Result<Option<Arc<EventPayload>>> {
        let _emitting = self.emit_lock.lock();
        self.error_lock.check()?;
        let me = self.config.validator;
        if me == 0 {
            return Ok(None);
        }
        let now = self.clock.now();
        let es = self.world.epoch_state();

        let composed = {
            let mut st = self.state.lock();
            if let Some(event) = st.parallel {
                return Err(EmitterError::ParallelInstance { event, validator: me });
            }
            if st.epoch != es.epoch {
                self.start_epoch(&mut st, &es, now);
            }
            match self.compose(&mut st, &es, now)? {
                Some(c) => {
                    st.emitting = Some(c.event.id());
                    c
                }
                None => {
                    self.metrics.record_skip();
                    return Ok(None);
                }
            }
        };

        let id = composed.event.id();
        let carries_version = !composed.event.header().extra.is_empty();
        let processed = self.world.process(composed.event);

        let mut st = self.state.lock();
        st.emitting = None;
        let event = processed?;
        st.own_seq = st.own_seq.max(event.seq());
        st.version_sent |= carries_version;
        st.prev_emitted.store(id)?;
        drop(st);

        self.world.broadcast(&event);
        self.metrics
            .record_emitted(event.txs().len(), composed.proposal);
        info!(
            event = %id,
            seq = event.seq(),
            frame = event.frame(),
            txs = event.txs().len(),
            proposal = composed.proposal,
            "[sn-07] ✨ Event emitted"
        );
        Ok(Some(event))
    }

    fn compose(
        &self,
        st: &mut EmitterState,
        es: &EpochState,
        now: UnixNanos,
    ) -> Result<Option<Composed>> {
        let me = self.config.validator;
        if !es.validators.exists(me) {
            trace!(validator = me, "[sn-07] Not a validator in this epoch");
            return Ok(None);
        }
        self.recheck_challenges(st, now);

        let status = self.sync_status(st, now);
        if let Err(not_synced) = synced_to_emit(&status, self.config.intervals.doublesign_protection)
        {
            self.metrics.record_not_synced();
            debug!(
                reason = %not_synced,
                wait_ms = not_synced.wait / NANOS_PER_MILLI,
                "[sn-07] ⏸️ Emission paused"
            );
            return Ok(None);
        }
        if let Some(id) = st.awaiting_own {
            debug!(event = %id, "[sn-07] ⏳ Last emitted event not connected yet");
            return Ok(None);
        }
        if st.index.dag().cheaters().contains(&me) {
            error!(validator = me, "[sn-07] ❌ Own fork in the DAG, not emitting");
            return Ok(None);
        }

        let self_parent = match st.index.dag().last_event_of(me) {
            Some(id) => match self.world.event(&id) {
                Some(e) => Some(e),
                None => {
                    debug!(event = %id, "[sn-07] Self-parent not available");
                    return Ok(None);
                }
            },
            None => None,
        };
        let rules = &es.rules;
        let (limit, stalled) = emitter_interval_limit(&rules.emitter, now, st.last_confirmation);
        let mut pacing = Pacing {
            passed: self_parent
                .as_ref()
                .map(|sp| now.saturating_sub(sp.header().creation_time)),
            limit,
            min: self.config.intervals.min,
            max: self.config.intervals.max,
            confirming: st
                .expected
                .get(&me)
                .copied()
                .unwrap_or(self.config.intervals.confirming),
            has_payload: false,
            has_to_confirm: !st.to_confirm.is_empty(),
        };
        if pacing.too_early() {
            return Ok(None);
        }

        let parent_ids = st.index.choose_parents(
            self_parent.as_ref().map(|sp| sp.id()),
            rules.dag.max_parents as usize,
        );
        let mut parents = Vec::with_capacity(parent_ids.len());
        for id in &parent_ids {
            match self.world.event(id) {
                Some(p) => parents.push(p),
                None => {
                    debug!(parent = %id, "[sn-07] Parent not available");
                    return Ok(None);
                }
            }
        }
        let headers: Vec<&EventHeader> = parents.iter().map(|p| p.header()).collect();
        let sp_header = self_parent.as_ref().map(|sp| sp.header());

        let creation_time = sp_header.map_or(now, |sp| now.max(sp.creation_time + 1));
        let mut median = median_time(me, creation_time, &headers, &es.validators);
        if let Some(sp) = sp_header {
            median = median.max(sp.median_time);
        }
        let version = rules.upgrades.expected_event_version();
        let frame = calc_frame(headers.iter().copied(), &es.validators);
        let mut event = MutableEventPayload {
            header: EventHeader {
                version,
                epoch: es.epoch,
                seq: sp_header.map_or(1, |sp| sp.seq + 1),
                frame,
                lamport: headers.iter().map(|h| h.lamport).max().unwrap_or(0) + 1,
                creator: me,
                parents: parent_ids,
                creation_time,
                median_time: median,
                ..Default::default()
            },
            ..Default::default()
        };
        if self.config.version_extra && !st.version_sent {
            let extra = version_extra();
            if extra.len() <= rules.dag.max_extra_data as usize {
                event.header.extra = extra;
            }
        }

        let mut sync_state = None;
        let mut propose_on: Option<LatestBlock> = None;
        if version == EVENT_VERSION_3 {
            let parent_states: Vec<ProposalSyncState> = parents
                .iter()
                .filter_map(|p| p.proposal_sync_state().copied())
                .collect();
            let incoming = incoming_state(es.epoch_start_block, parent_states.iter());
            let pending = !self.selector.is_empty();
            if let Some(head) = self.world.latest_block() {
                if is_allowed_to_propose(me, &es.validators, &incoming, frame, head.number)?
                    && wants_proposal(
                        pending,
                        creation_time,
                        head.time,
                        rules.blocks.max_empty_block_skip_period,
                    )
                {
                    propose_on = Some(head);
                }
            }
            pacing.has_payload = propose_on.is_some() || pending;
            sync_state = Some(incoming);
        } else {
            let votes = self.world.pending_votes();
            event.txs = self.originate_txs(st, es, now);
            pacing.has_payload = !event.txs.is_empty() || !votes.is_empty();
            event.block_votes = votes.block_votes;
            event.epoch_vote = votes.epoch_vote;
            event.misbehaviour_proofs = votes.misbehaviour_proofs;
        }
        if !pacing.should_emit() {
            return Ok(None);
        }
        if stalled {
            debug!("[sn-07] 🐢 Network stalled, emitting at the stalled interval");
        }

        if let Some(incoming) = sync_state {
            let mut payload = Payload {
                proposal_sync_state: incoming,
                proposal: None,
            };
            if let Some(head) = propose_on {
                let txs = self.fill_proposal(&head, rules, limit);
                payload.proposal = Some(build_proposal(
                    &head,
                    creation_time,
                    txs,
                    self.signer.as_ref(),
                )?);
                payload.proposal_sync_state = advance(&incoming, frame);
            }
            event.payload = Some(payload);
        }

        let available = calc_gas_power(es, me, sp_header, event.header.median_time);
        let Some(used) = fit_gas(&mut event, rules, &available) else {
            debug!(
                available = available.min(),
                "[sn-07] ⛽ Not enough gas power"
            );
            return Ok(None);
        };
        let Some(left) = available.sub(used) else {
            return Ok(None);
        };
        event.header.gas_power_used = used;
        event.header.gas_power_left = left;
        event.header.payload_hash = event.compute_payload_hash();
        let signature = self.signer.sign_hash(&event.header.hash_to_sign())?;
        Ok(Some(Composed {
            proposal: propose_on.is_some(),
            event: event.build(EventSignature(signature)),
        }))
    }

    /// Pooled transactions this validator should put into a version-2
    /// event now.
    fn originate_txs(&self, st: &EmitterState, es: &EpochState, now: UnixNanos) -> Vec<Transaction> {
        let me = self.config.validator;
        let base_fee = self
            .world
            .latest_block()
            .map_or(es.rules.economy.min_base_fee, |head| head.base_fee);
        let mut out = Vec::new();
        for ptx in self.selector.ordered(base_fee) {
            if out.len() >= self.config.max_txs_per_event {
                break;
            }
            if st.originated.contains_key(&ptx.hash) {
                continue;
            }
            let seen = self.metrics.record_tx_seen(ptx.hash, ptx.added_at);
            let turn = tx_turn(
                &turn_seed(&ptx.sender, ptx.tx.nonce),
                &es.validators,
                &st.offline,
                now.saturating_sub(seen),
                self.config.tx_turn_period,
            );
            if turn == Some(me) {
                out.push(ptx.tx.clone());
            }
        }
        out
    }

    /// Fill a proposal on a scratch copy of the head state.
    fn fill_proposal(&self, head: &LatestBlock, rules: &Rules, interval: UnixNanos) -> Vec<Transaction> {
        let mut runner = self.world.tx_runner(head);
        let limits = SelectionLimits {
            gas_limit: rules.blocks.max_block_gas,
            max_size: proposal_size_limit(rules.upgrades.brio),
            base_fee: head.base_fee,
            deadline: self
                .selector
                .deadline(Instant::now(), Duration::from_nanos(interval)),
        };
        let selection = self.selector.select_for_proposal(runner.as_mut(), &limits);
        debug!(
            block = head.number + 1,
            selected = selection.txs.len(),
            considered = selection.considered,
            timed_out = selection.timed_out,
            "[sn-07] 📦 Proposal filled"
        );
        selection.txs.iter().map(|ptx| ptx.tx.clone()).collect()
    }

    fn next_pause(&self) -> Duration {
        jittered(
            self.config.tick,
            self.config.jitter_percent(),
            &mut *self.rng.lock(),
        )
    }

    /// Run the tick loop until [`Self::stop`] or a permanent error.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock() = Some(shutdown_tx);
        let emitter = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                validator = emitter.config.validator,
                "[sn-07] 🚀 Emitter started"
            );
            loop {
                let pause = emitter.next_pause();
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("[sn-07] Emitter stopped");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(pause) => {}
                }
                if let Err(err) = emitter.tick() {
                    error!(error = %err, "[sn-07] 🛑 Emitter halted");
                    return Err(err);
                }
            }
        })
    }

    /// Stop the tick loop.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl ConfirmedEventListener for Emitter {
    fn on_event_confirmed(&self, event: &EventPayload) {
        let now = self.clock.now();
        let mut st = self.state.lock();
        st.to_confirm.remove(&event.id());
        if event.creator() == self.config.validator {
            st.last_confirmation = st.last_confirmation.max(now);
        }
        for tx in event.txs().iter().chain(proposal_txs(event)) {
            let hash = tx.hash();
            st.originated.remove(&hash);
            self.metrics.record_tx_confirmed(&hash, now);
        }
    }
}

fn recount(st: &mut EmitterState, base: Duration) {
    let expected = confirming_intervals(st.index.dag().validators(), &st.offline, base);
    st.expected = expected;
}

/// Start-up guard against a lost or stale prev-emitted file.
fn restart_check(config: &EmitterConfig, world: &dyn World, st: &mut EmitterState, now: UnixNanos) {
    let me = config.validator;
    if let Some(id) = st.prev_emitted.get() {
        if id.epoch() == st.epoch && world.event(&id).is_none() {
            info!(event = %id, "[sn-07] ⏳ Waiting for the last emitted event");
            st.awaiting_own = Some(id);
        }
    }
    let Some(last) = world.last_event(me) else {
        return;
    };
    if last.epoch() == st.epoch {
        st.own_seq = last.seq();
    }
    let window = config.intervals.doublesign_protection.as_nanos() as UnixNanos;
    let recorded = st.prev_emitted.get() == Some(last.id());
    let recent = now.saturating_sub(last.header().creation_time) < window;
    if !recorded && recent && st.awaiting_own.is_none() {
        warn!(
            event = %last.id(),
            "[sn-07] ⚠️ Latest own event was not emitted by this node, pausing emission"
        );
        st.external_detected = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{EvmTxRunner, ManualClock};
    use crate::config::EmitIntervals;
    use parking_lot::RwLock;
    use shared_crypto::{Secp256k1KeyPair, SenderCache, TxSigner};
    use shared_types::{
        Address, BlockNumber, ChainConfig, TxType, Upgrades, ValidatorProfile, GWEI,
        NANOS_PER_SEC, U256,
    };
    use sn_03_event_check::{CheckMetrics, Checkers, Reader};
    use sn_06_tx_selector::{SelectorConfig, SelectorMetrics, TxRunner};
    use sn_08_block_processor::{Evm, EvmBlockContext, TransferEvm};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    const START: UnixNanos = 100 * NANOS_PER_SEC;

    struct MemDag {
        epoch: Arc<EpochState>,
        events: RwLock<HashMap<EventId, Arc<EventPayload>>>,
        blocks: RwLock<HashMap<BlockNumber, Hash>>,
    }

    impl Reader for MemDag {
        fn epoch_state(&self) -> Arc<EpochState> {
            Arc::clone(&self.epoch)
        }
        fn event(&self, id: &EventId) -> Option<Arc<EventPayload>> {
            self.events.read().get(id).cloned()
        }
        fn block_hash(&self, number: BlockNumber) -> Option<Hash> {
            self.blocks.read().get(&number).copied()
        }
    }

    struct TestWorld {
        dag: Arc<MemDag>,
        checkers: Checkers,
        evm: Arc<TransferEvm>,
        head: RwLock<Option<LatestBlock>>,
        peers: AtomicUsize,
        broadcasts: AtomicUsize,
        emitters: RwLock<Vec<Weak<Emitter>>>,
    }

    impl World for TestWorld {
        fn epoch_state(&self) -> Arc<EpochState> {
            Arc::clone(&self.dag.epoch)
        }
        fn latest_block(&self) -> Option<LatestBlock> {
            *self.head.read()
        }
        fn event(&self, id: &EventId) -> Option<Arc<EventPayload>> {
            self.dag.event(id)
        }
        fn last_event(&self, creator: ValidatorId) -> Option<Arc<EventPayload>> {
            self.dag
                .events
                .read()
                .values()
                .filter(|e| e.creator() == creator)
                .max_by_key(|e| e.seq())
                .cloned()
        }
        fn process(&self, event: EventPayload) -> Result<Arc<EventPayload>> {
            self.checkers.validate_full(&event)?;
            let event = Arc::new(event);
            self.dag.events.write().insert(event.id(), Arc::clone(&event));
            let emitters: Vec<Arc<Emitter>> =
                self.emitters.read().iter().filter_map(Weak::upgrade).collect();
            for emitter in emitters {
                emitter.on_event_connected(&event);
            }
            Ok(event)
        }
        fn broadcast(&self, _: &Arc<EventPayload>) {
            self.broadcasts.fetch_add(1, Ordering::Relaxed);
        }
        fn peer_count(&self) -> usize {
            self.peers.load(Ordering::Relaxed)
        }
        fn is_synced(&self) -> bool {
            true
        }
        fn tx_runner(&self, head: &LatestBlock) -> Box<dyn TxRunner + Send> {
            let ctx = EvmBlockContext {
                number: head.number + 1,
                time: head.time + 1,
                prev_randao: head.prev_randao,
                base_fee: head.base_fee,
                gas_limit: self.dag.epoch.rules.blocks.max_block_gas,
                chain: ChainConfig::default(),
                rules: self.dag.epoch.rules.clone(),
            };
            Box::new(EvmTxRunner::new(self.evm.begin(ctx), self.evm.clone()))
        }
    }

    struct Net {
        key: Arc<Secp256k1KeyPair>,
        user: Secp256k1KeyPair,
        world: Arc<TestWorld>,
        selector: Arc<TxSelector>,
        clock: Arc<ManualClock>,
    }

    impl Net {
        fn new(upgrades: Upgrades) -> Self {
            let key = Secp256k1KeyPair::generate();
            let user = Secp256k1KeyPair::generate();
            let profiles = [(
                1,
                ValidatorProfile {
                    weight: U256::from(1u64),
                    pubkey: key.validator_pubkey().as_bytes().to_vec(),
                },
            )]
            .into_iter()
            .collect();
            let rules = Rules::fake_net().with_upgrades(upgrades);
            let epoch = Arc::new(EpochState::genesis(1, 1, profiles, rules));
            let senders = Arc::new(SenderCache::new(TxSigner::new(epoch.rules.network_id), 64));
            let dag = Arc::new(MemDag {
                epoch: Arc::clone(&epoch),
                events: RwLock::new(HashMap::new()),
                blocks: RwLock::new(HashMap::new()),
            });
            let world = Arc::new(TestWorld {
                checkers: Checkers::new(dag.clone(), senders.clone(), Arc::new(CheckMetrics::new())),
                dag,
                evm: Arc::new(TransferEvm::new([(user.address(), U256::exp10(21))], None)),
                head: RwLock::new(None),
                peers: AtomicUsize::new(1),
                broadcasts: AtomicUsize::new(0),
                emitters: RwLock::new(Vec::new()),
            });
            let selector = Arc::new(TxSelector::new(
                SelectorConfig::default(),
                epoch.rules.economy.min_gas_price,
                senders,
                Arc::new(SelectorMetrics::new()),
            ));
            Self {
                key: Arc::new(key),
                user,
                world,
                selector,
                clock: Arc::new(ManualClock::new(START)),
            }
        }

        fn emitter_with(&self, config: EmitterConfig, lock: Arc<ErrorLock>) -> Result<Arc<Emitter>> {
            let emitter = Arc::new(Emitter::new(
                config,
                self.world.clone(),
                self.key.clone(),
                self.selector.clone(),
                self.clock.clone(),
                lock,
            )?);
            self.world.emitters.write().push(Arc::downgrade(&emitter));
            Ok(emitter)
        }

        fn emitter(&self) -> Arc<Emitter> {
            self.emitter_with(EmitterConfig::fake_net(1), Arc::new(ErrorLock::in_memory()))
                .unwrap()
        }

        fn transfer(&self, nonce: u64) -> Hash {
            let tx = Transaction {
                tx_type: TxType::DynamicFee,
                nonce,
                gas: 21_000,
                gas_fee_cap: U256::from(10 * GWEI),
                to: Some(Address::repeat_byte(7)),
                value: U256::from(1u64),
                ..Default::default()
            };
            let tx = TxSigner::new(Rules::fake_net().network_id)
                .sign(tx, &self.user)
                .unwrap();
            self.selector.add(tx, 0, self.clock.now()).unwrap()
        }

        fn advance_ms(&self, ms: u64) {
            self.clock.advance(ms * NANOS_PER_MILLI);
        }
    }

    fn protected(validator: ValidatorId) -> EmitterConfig {
        EmitterConfig {
            intervals: EmitIntervals {
                doublesign_protection: Duration::from_secs(600),
                parallel_instance_protection: Duration::from_secs(60),
                ..EmitterConfig::fake_net(validator).intervals
            },
            ..EmitterConfig::fake_net(validator)
        }
    }

    #[test]
    fn test_first_event_then_paced() {
        let net = Net::new(Upgrades::sonic());
        let em = net.emitter();

        let first = em.tick().unwrap().expect("first event");
        assert_eq!((first.seq(), first.frame(), first.lamport()), (1, 1, 1));
        assert_eq!(first.header().creation_time, START);
        assert!(!first.header().extra.is_empty(), "version tag");
        assert_eq!(net.world.broadcasts.load(Ordering::Relaxed), 1);

        assert!(em.tick().unwrap().is_none(), "network interval");
        net.advance_ms(300);
        assert!(em.tick().unwrap().is_none(), "nothing to carry");

        net.advance_ms(1_000);
        let second = em.tick().unwrap().expect("max interval");
        assert_eq!(second.seq(), 2);
        assert_eq!(second.frame(), 2);
        assert_eq!(second.parents()[0], first.id());
        assert!(second.header().extra.is_empty());
        assert_eq!(em.metrics().get_emitted(), 2);
    }

    #[test]
    fn test_originates_pooled_txs_once() {
        let net = Net::new(Upgrades::sonic());
        let em = net.emitter();
        let hash = net.transfer(0);

        let first = em.tick().unwrap().unwrap();
        assert_eq!(first.txs().len(), 1);
        assert_eq!(first.txs()[0].hash(), hash);
        assert_eq!(em.metrics().get_txs_originated(), 1);

        net.advance_ms(300);
        let second = em.tick().unwrap().expect("confirming interval");
        assert!(second.txs().is_empty(), "already originated");

        em.on_event_confirmed(&first);
        assert_eq!(em.metrics().txs_confirmed.load(Ordering::Relaxed), 1);
        net.advance_ms(300);
        let third = em.tick().unwrap().expect("retry after confirmation");
        assert_eq!(third.txs().len(), 1, "still pooled, so offered again");
    }

    #[test]
    fn test_single_proposer_proposes_once_per_block() {
        let net = Net::new(Upgrades::single_proposer());
        let head = LatestBlock {
            number: 0,
            hash: Hash::repeat_byte(0xaa),
            time: START - 5 * NANOS_PER_SEC,
            prev_randao: Hash::repeat_byte(0x11),
            base_fee: U256::from(GWEI),
        };
        *net.world.head.write() = Some(head);
        net.world.dag.blocks.write().insert(0, head.hash);
        let em = net.emitter();
        net.transfer(0);

        let first = em.tick().unwrap().unwrap();
        let payload = first.payload().unwrap();
        let proposal = payload.proposal.as_ref().expect("proposal");
        assert_eq!(proposal.number, 1);
        assert_eq!(proposal.parent_hash, head.hash);
        assert_eq!(proposal.transactions.len(), 1);
        assert_eq!(payload.proposal_sync_state.last_seen_proposed_block, 1);
        assert!(first.txs().is_empty());

        net.advance_ms(300);
        let second = em.tick().unwrap().expect("pool not empty");
        let payload = second.payload().unwrap();
        assert!(payload.proposal.is_none(), "block 1 not produced yet");
        assert_eq!(payload.proposal_sync_state.last_seen_proposed_block, 1);
        assert_eq!(em.metrics().get_proposals(), 1);
    }

    #[test]
    fn test_parallel_instance_halts() {
        let net = Net::new(Upgrades::sonic());
        let a = net
            .emitter_with(protected(1), Arc::new(ErrorLock::in_memory()))
            .unwrap();
        let lock = Arc::new(ErrorLock::in_memory());
        let b = net.emitter_with(protected(1), lock.clone()).unwrap();

        a.tick().unwrap().unwrap();
        assert!(lock.is_locked());
        assert!(matches!(
            b.tick(),
            Err(EmitterError::Locked(_)) | Err(EmitterError::ParallelInstance { .. })
        ));
    }

    #[test]
    fn test_restart_pauses_on_unrecorded_event() {
        let net = Net::new(Upgrades::sonic());
        let a = net.emitter_with(protected(1), Arc::new(ErrorLock::in_memory())).unwrap();
        let first = a.tick().unwrap().unwrap();
        drop(a);

        let b = net.emitter_with(protected(1), Arc::new(ErrorLock::in_memory())).unwrap();
        b.on_event_connected(&first);
        assert!(b.tick().unwrap().is_none());
        assert_eq!(b.metrics().not_synced.load(Ordering::Relaxed), 1);

        net.advance_ms(601_000);
        let next = b.tick().unwrap().expect("window over");
        assert_eq!(next.seq(), 2);
        assert_eq!(next.parents()[0], first.id());
    }

    #[test]
    fn test_no_peers_blocks_protected_emission() {
        let net = Net::new(Upgrades::sonic());
        net.world.peers.store(0, Ordering::Relaxed);
        let em = net.emitter_with(protected(1), Arc::new(ErrorLock::in_memory())).unwrap();
        assert!(em.tick().unwrap().is_none());
        net.world.peers.store(2, Ordering::Relaxed);
        assert!(em.tick().unwrap().is_some());
    }

    #[test]
    fn test_prev_emitted_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let net = Net::new(Upgrades::sonic());
        let config = EmitterConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..EmitterConfig::fake_net(1)
        };
        let em = net.emitter_with(config, Arc::new(ErrorLock::in_memory())).unwrap();
        let event = em.tick().unwrap().unwrap();
        assert_eq!(PrevEmitted::load(dir.path()).unwrap().get(), Some(event.id()));
    }

    #[test]
    fn test_locked_node_refuses_to_start() {
        let net = Net::new(Upgrades::sonic());
        let lock = Arc::new(ErrorLock::in_memory());
        lock.permanent(&EmitterError::CorruptPrevEmitted("x".into()));
        assert!(matches!(
            net.emitter_with(EmitterConfig::fake_net(1), lock),
            Err(EmitterError::Locked(_))
        ));
    }

    #[test]
    fn test_non_validator_never_emits() {
        let net = Net::new(Upgrades::sonic());
        let em = net
            .emitter_with(EmitterConfig::fake_net(9), Arc::new(ErrorLock::in_memory()))
            .unwrap();
        assert!(em.tick().unwrap().is_none());
        let disabled = net
            .emitter_with(EmitterConfig::fake_net(0), Arc::new(ErrorLock::in_memory()))
            .unwrap();
        assert!(disabled.tick().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_and_stop() {
        let net = Net::new(Upgrades::sonic());
        let em = net.emitter();
        let handle = em.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        em.stop();
        assert!(handle.await.unwrap().is_ok());
        assert_eq!(em.metrics().get_emitted(), 1);
    }
}
