//! # Quorum Indexer
//!
//! Keeps a global matrix `M[i][j]`: the highest seq of validator `j` seen in
//! the subgraph of validator `i`'s latest event. Each column reduces to a
//! threshold seq, the value a quorum of stake has already reached. A parent
//! set scores by the stake of validators it advances past what the self
//! parent knows, with a bonus for crossing the threshold.
//!
//! Writes only mark the cached thresholds dirty; they are recomputed on the
//! next metric query.

use super::dag::DagIndex;
use super::Metric;
use shared_types::{EventId, Seq, ValidatorId, Validators};

/// Quorum-progress indexer.
#[derive(Debug, Default)]
pub struct QuorumIndexer {
    validators: Validators,
    me: Option<usize>,
    global_matrix: Vec<Vec<Seq>>,
    self_parent_seqs: Vec<Seq>,
    threshold_seqs: Vec<Seq>,
    dirty: bool,
}

impl QuorumIndexer {
    /// Indexer for `me` within `validators`.
    pub fn new(validators: Validators, me: ValidatorId) -> Self {
        let n = validators.len();
        Self {
            me: validators.get_idx(me),
            global_matrix: vec![vec![0; n]; n],
            self_parent_seqs: vec![0; n],
            threshold_seqs: vec![0; n],
            validators,
            dirty: false,
        }
    }

    /// Fold a newly indexed event into the matrix.
    pub fn process_event(&mut self, dag: &DagIndex, id: &EventId) {
        let Some(vertex) = dag.vertex(id) else {
            return;
        };
        let Some(clock) = dag.highest_before(id) else {
            return;
        };
        let seqs = dag.observed_seqs(clock);
        let row = &mut self.global_matrix[vertex.creator_idx];
        for (j, observed) in seqs.iter().enumerate() {
            row[j] = row[j].max(observed.seq);
        }
        if Some(vertex.creator_idx) == self.me {
            self.self_parent_seqs = row.clone();
        }
        self.dirty = true;
    }

    fn recache(&mut self) {
        let quorum = self.validators.quorum();
        for j in 0..self.validators.len() {
            let mut column: Vec<(Seq, u64)> = (0..self.validators.len())
                .map(|i| {
                    (
                        self.global_matrix[i][j],
                        u64::from(self.validators.get_weight_by_idx(i)),
                    )
                })
                .collect();
            column.sort_by(|a, b| b.0.cmp(&a.0));
            let mut acc = 0u64;
            let mut threshold = 0;
            for (seq, weight) in column {
                acc += weight;
                if acc >= quorum {
                    threshold = seq;
                    break;
                }
            }
            self.threshold_seqs[j] = threshold;
        }
        self.dirty = false;
    }

    /// Threshold seq of validator index `j`.
    pub fn threshold_seq(&mut self, j: usize) -> Seq {
        if self.dirty {
            self.recache();
        }
        self.threshold_seqs.get(j).copied().unwrap_or(0)
    }

    /// Score of an event with `parents`.
    pub fn get_metric_of(&mut self, dag: &DagIndex, parents: &[EventId]) -> Metric {
        if self.dirty {
            self.recache();
        }
        let clock = dag.merged_highest_before(parents);
        let observed = dag.observed_seqs(&clock);
        let mut metric = 0;
        for (j, seen) in observed.iter().enumerate() {
            if seen.fork {
                continue;
            }
            let known = self.self_parent_seqs.get(j).copied().unwrap_or(0);
            if seen.seq <= known {
                continue;
            }
            let weight = Metric::from(self.validators.get_weight_by_idx(j));
            metric += weight;
            let threshold = self.threshold_seqs.get(j).copied().unwrap_or(0);
            if seen.seq >= threshold && known < threshold {
                metric += weight;
            }
        }
        metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dag::tests::Builder;

    #[test]
    fn test_threshold_is_quorum_value() {
        let mut b = Builder::new(&[1, 2, 3, 4]);
        let mut q = QuorumIndexer::new(b.dag.validators().clone(), 1);
        let a1 = b.emit(1, &[], 1);
        let a2 = b.emit(1, &[], 1);
        let a3 = b.emit(1, &[], 1);
        for id in [a1, a2, a3] {
            q.process_event(&b.dag, &id);
        }
        // Only validator 1 knows its own seq 3; the quorum knows nothing.
        assert_eq!(q.threshold_seq(0), 0);

        let x = b.emit(2, &[a3], 1);
        let y = b.emit(3, &[a2], 1);
        q.process_event(&b.dag, &x);
        q.process_event(&b.dag, &y);
        // Seqs of validator 1 known: [3, 3, 2, 0]; quorum 3 reaches seq 2.
        assert_eq!(q.threshold_seq(0), 2);
    }

    #[test]
    fn test_metric_prefers_new_information() {
        let mut b = Builder::new(&[1, 2, 3]);
        let mut q = QuorumIndexer::new(b.dag.validators().clone(), 1);
        let a1 = b.emit(1, &[], 1);
        let b1 = b.emit(2, &[], 1);
        let b2 = b.emit(2, &[], 1);
        let c1 = b.emit(3, &[], 1);
        for id in [a1, b1, b2, c1] {
            q.process_event(&b.dag, &id);
        }
        let fresh = q.get_metric_of(&b.dag, &[a1, b2]);
        let stale = q.get_metric_of(&b.dag, &[a1]);
        assert!(fresh > stale);
        assert_eq!(stale, 0);
    }
}
