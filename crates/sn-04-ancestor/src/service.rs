//! # Ancestor Index Service
//!
//! Owns the epoch's [`DagIndex`] and every indexer fed from it, and answers
//! the emitter's single question: which parents should the next event have?

use crate::config::AncestorConfig;
use crate::domain::dag::DagIndex;
use crate::domain::payload::PayloadIndexer;
use crate::domain::progress::{ProgressIndexer, ProgressMetric};
use crate::domain::quorum::QuorumIndexer;
use crate::domain::search::{choose_parents, plan_strategies, SearchStrategy};
use crate::domain::Metric;
use crate::error::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_types::{EventHeader, EventId, ValidatorId, Validators};

/// DAG index plus parent-selection indexers of one validator.
pub struct AncestorIndex {
    me: ValidatorId,
    dag: DagIndex,
    quorum: QuorumIndexer,
    progress: ProgressIndexer,
    payload: PayloadIndexer,
    rng: StdRng,
}

impl AncestorIndex {
    /// Index for validator `me`.
    pub fn new(
        config: &AncestorConfig,
        validators: Validators,
        me: ValidatorId,
        metric: ProgressMetric,
    ) -> Self {
        Self {
            me,
            quorum: QuorumIndexer::new(validators.clone(), me),
            dag: DagIndex::new(validators),
            progress: ProgressIndexer::new(metric),
            payload: PayloadIndexer::new(config.payload_cache_size),
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a seeded generator for random slots.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Start a new epoch.
    pub fn reset(&mut self, validators: Validators, metric: ProgressMetric) {
        tracing::debug!(
            validators = validators.len(),
            ?metric,
            "[sn-04] 🔄 Resetting ancestor index"
        );
        self.quorum = QuorumIndexer::new(validators.clone(), self.me);
        self.dag.reset(validators);
        self.progress = ProgressIndexer::new(metric);
        self.payload.reset();
    }

    /// The underlying DAG index.
    pub fn dag(&self) -> &DagIndex {
        &self.dag
    }

    /// Index an event. `payload_metric` is its own payload weight, usually
    /// the number of transactions it carries.
    pub fn add_event(&mut self, header: &EventHeader, payload_metric: Metric) -> Result<()> {
        self.dag.add(header)?;
        let id = header.id();
        self.quorum.process_event(&self.dag, &id);
        self.progress.process_event(&self.dag, &id);
        self.payload.process_event(id, &header.parents, payload_metric);
        Ok(())
    }

    /// Choose up to `max_parents` parents, starting with `self_parent`.
    ///
    /// Candidates are current heads of honest validators other than `me`.
    pub fn choose_parents(
        &mut self,
        self_parent: Option<EventId>,
        max_parents: usize,
    ) -> Vec<EventId> {
        let existing: Vec<EventId> = self_parent.into_iter().collect();
        let validators = self.dag.validators();
        let cheaters = self.dag.cheaters();
        let options: Vec<EventId> = self
            .dag
            .heads()
            .filter(|id| {
                self.dag.vertex(id).is_some_and(|v| {
                    let creator = validators.get_id(v.creator_idx).unwrap_or(self.me);
                    creator != self.me && !cheaters.contains(&creator)
                })
            })
            .copied()
            .collect();
        let plan = plan_strategies(max_parents.saturating_sub(existing.len()));

        let dag = &self.dag;
        let quorum = &mut self.quorum;
        let progress = &self.progress;
        let payload = &mut self.payload;
        let parents = choose_parents(
            &existing,
            &options,
            &plan,
            |strategy, parents| match strategy {
                SearchStrategy::Payload => payload.get_metric_of(parents),
                SearchStrategy::Progress => progress.get_metric_of(dag, parents),
                SearchStrategy::Quorum => quorum.get_metric_of(dag, parents),
                SearchStrategy::Random => 0,
            },
            &mut self.rng,
        );
        tracing::trace!(
            parents = parents.len(),
            options = options.len(),
            "[sn-04] 🧭 Parents chosen"
        );
        parents
    }
}
