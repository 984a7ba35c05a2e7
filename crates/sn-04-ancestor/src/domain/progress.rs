//! # Root-Knowledge Indexer
//!
//! Scores a candidate parent set by how many roots of the top frame a new
//! event with those parents would know about "strongly enough". Two flavours
//! share the structure and differ only in the relation used:
//!
//! - [`ProgressMetric::ForklessCause`]: the quorum of observers must not
//!   include forking validators.
//! - [`ProgressMetric::StronglyReach`]: plain quorum reachability.
//!
//! The score counts stake-weighted roots, plus a small term for every root
//! that is merely observed, so that partial progress still orders options.

use super::dag::DagIndex;
use super::Metric;
use serde::Deserialize;
use shared_types::{EventId, Frame};

/// Relation used to decide that a root is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMetric {
    /// Forkless-cause relation.
    #[default]
    ForklessCause,
    /// Strongly-reach relation.
    StronglyReach,
}

/// Root-knowledge indexer.
#[derive(Debug, Default)]
pub struct ProgressIndexer {
    metric: ProgressMetric,
    top_frame: Frame,
}

/// Stake weight granted per fully known root, relative to an observed one.
const KNOWN_ROOT_FACTOR: Metric = 16;

impl ProgressIndexer {
    /// Indexer using `metric`.
    pub fn new(metric: ProgressMetric) -> Self {
        Self {
            metric,
            top_frame: 0,
        }
    }

    /// Relation in use.
    pub fn metric(&self) -> ProgressMetric {
        self.metric
    }

    /// Highest frame with a root seen so far.
    pub fn top_frame(&self) -> Frame {
        self.top_frame
    }

    /// Track a newly indexed event.
    pub fn process_event(&mut self, dag: &DagIndex, id: &EventId) {
        if let Some(v) = dag.vertex(id) {
            if v.is_root && v.frame > self.top_frame {
                self.top_frame = v.frame;
            }
        }
    }

    /// Forget everything, e.g. on a new epoch.
    pub fn reset(&mut self) {
        self.top_frame = 0;
    }

    /// Score of an event with `parents`.
    pub fn get_metric_of(&self, dag: &DagIndex, parents: &[EventId]) -> Metric {
        let clock = dag.merged_highest_before(parents);
        let validators = dag.validators();
        let mut metric = 0;
        for root in dag.roots_of(self.top_frame) {
            let weight = Metric::from(validators.get_weight_by_idx(root.creator_idx));
            let known = match self.metric {
                ProgressMetric::ForklessCause => dag.forkless_cause(&clock, &root.id),
                ProgressMetric::StronglyReach => dag.strongly_reach(&clock, &root.id),
            };
            if known {
                metric += weight * KNOWN_ROOT_FACTOR;
            } else if clock.get(branch_seq_slot(dag, &root.id)).is_some_and(|s| *s >= root.seq) {
                metric += weight;
            }
        }
        metric
    }
}

fn branch_seq_slot(dag: &DagIndex, id: &EventId) -> usize {
    dag.branch_of(id).unwrap_or(usize::MAX)
}
