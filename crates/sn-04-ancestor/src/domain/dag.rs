//! # Vector-Clock DAG Index
//!
//! Indexes the events of one epoch with two vector clocks per event:
//!
//! - **highest-before**: for every branch, the highest seq observed in the
//!   event's subgraph.
//! - **lowest-after**: for every branch, the lowest seq of an event that
//!   observes this event.
//!
//! A branch is a linear chain of one creator's events. An honest creator has
//! exactly one branch; each fork opens another. An event *observes a fork*
//! of a creator when its subgraph contains two events of that creator with
//! the same seq.
//!
//! ```text
//!  creator A:   a1 ── a2 ── a3          branch 0
//!                      └─── a3'         branch 3 (fork, start seq 3)
//! ```
//!
//! Events reference parents by id; vertices live in an arena and refer to
//! each other by index.

use crate::error::{AncestorError, Result};
use shared_types::{EventHeader, EventId, Frame, Lamport, Seq, ValidatorId, Validators};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
struct Branch {
    start_seq: Seq,
    head: usize,
}

/// An indexed event.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Event id.
    pub id: EventId,
    /// Index of the creator in the validator set.
    pub creator_idx: usize,
    /// Sequence number.
    pub seq: Seq,
    /// Frame.
    pub frame: Frame,
    /// Lamport time.
    pub lamport: Lamport,
    /// True if first event of its creator in its frame.
    pub is_root: bool,
    branch: usize,
    parents: Vec<usize>,
    highest_before: Vec<Seq>,
    lowest_after: Vec<Seq>,
}

/// Highest observed seq of one validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservedSeq {
    /// Highest seq over all branches.
    pub seq: Seq,
    /// True if two branches were observed conflicting.
    pub fork: bool,
}

/// Vector-clock index over one epoch's events.
#[derive(Debug, Default)]
pub struct DagIndex {
    validators: Validators,
    vertices: Vec<Vertex>,
    by_id: HashMap<EventId, usize>,
    branches: Vec<Branch>,
    creator_branches: Vec<Vec<usize>>,
    heads: BTreeSet<EventId>,
    cheaters: BTreeSet<ValidatorId>,
}

impl DagIndex {
    /// Empty index over `validators`.
    pub fn new(validators: Validators) -> Self {
        let creator_branches = vec![Vec::new(); validators.len()];
        Self {
            validators,
            creator_branches,
            ..Default::default()
        }
    }

    /// Drop every event and start over with `validators`.
    pub fn reset(&mut self, validators: Validators) {
        *self = Self::new(validators);
    }

    /// Indexed validator set.
    pub fn validators(&self) -> &Validators {
        &self.validators
    }

    /// Number of indexed events.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// True if `id` is indexed.
    pub fn contains(&self, id: &EventId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Indexed vertex of `id`.
    pub fn vertex(&self, id: &EventId) -> Option<&Vertex> {
        self.by_id.get(id).map(|i| &self.vertices[*i])
    }

    /// Events nobody references yet, in id order.
    pub fn heads(&self) -> impl Iterator<Item = &EventId> + '_ {
        self.heads.iter()
    }

    /// Validators observed creating forks.
    pub fn cheaters(&self) -> &BTreeSet<ValidatorId> {
        &self.cheaters
    }

    /// Latest event of `creator` on its longest branch.
    pub fn last_event_of(&self, creator: ValidatorId) -> Option<EventId> {
        let idx = self.validators.get_idx(creator)?;
        self.creator_branches[idx]
            .iter()
            .map(|b| &self.vertices[self.branches[*b].head])
            .max_by_key(|v| (v.seq, std::cmp::Reverse(v.id)))
            .map(|v| v.id)
    }

    /// Index `header`. Parents must be indexed first; re-adding is a no-op.
    pub fn add(&mut self, header: &EventHeader) -> Result<()> {
        let id = header.id();
        if self.by_id.contains_key(&id) {
            return Ok(());
        }
        let creator_idx = self
            .validators
            .get_idx(header.creator)
            .ok_or(AncestorError::UnknownCreator(header.creator))?;

        let mut parents = Vec::with_capacity(header.parents.len());
        for p in &header.parents {
            let pi = *self.by_id.get(p).ok_or(AncestorError::UnknownParent(*p))?;
            parents.push(pi);
        }

        let self_parent = match header.self_parent() {
            Some(sp) => {
                let spi = self.by_id[sp];
                let v = &self.vertices[spi];
                if v.creator_idx != creator_idx || v.seq + 1 != header.seq {
                    return Err(AncestorError::BadSelfParent(*sp));
                }
                Some(spi)
            }
            None => None,
        };

        let index = self.vertices.len();
        let branch = self.assign_branch(creator_idx, header.seq, self_parent, index);

        let mut highest_before = vec![0; self.branches.len()];
        for &pi in &parents {
            for (slot, seq) in self.vertices[pi].highest_before.iter().enumerate() {
                highest_before[slot] = highest_before[slot].max(*seq);
            }
        }
        highest_before[branch] = header.seq;

        let is_root = match self_parent {
            Some(spi) => self.vertices[spi].frame < header.frame,
            None => true,
        };

        self.vertices.push(Vertex {
            id,
            creator_idx,
            seq: header.seq,
            frame: header.frame,
            lamport: header.lamport,
            is_root,
            branch,
            parents: parents.clone(),
            highest_before,
            lowest_after: Vec::new(),
        });
        self.by_id.insert(id, index);
        self.fill_lowest_after(index, branch, header.seq);

        for &pi in &parents {
            self.heads.remove(&self.vertices[pi].id);
        }
        self.heads.insert(id);

        if self.creator_branches[creator_idx].len() > 1
            && self.cheaters.insert(header.creator)
        {
            tracing::warn!(
                creator = header.creator,
                event = %id,
                "[sn-04] ⚠️ Fork detected"
            );
        }
        Ok(())
    }

    fn assign_branch(
        &mut self,
        creator_idx: usize,
        seq: Seq,
        self_parent: Option<usize>,
        vertex: usize,
    ) -> usize {
        let extends = self.creator_branches[creator_idx]
            .iter()
            .copied()
            .find(|b| Some(self.branches[*b].head) == self_parent);
        if let Some(b) = extends {
            self.branches[b].head = vertex;
            return b;
        }
        let b = self.branches.len();
        self.branches.push(Branch {
            start_seq: seq,
            head: vertex,
        });
        self.creator_branches[creator_idx].push(b);
        b
    }

    fn fill_lowest_after(&mut self, start: usize, branch: usize, seq: Seq) {
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            let la = &mut self.vertices[i].lowest_after;
            if la.len() <= branch {
                la.resize(branch + 1, 0);
            }
            if la[branch] != 0 {
                continue;
            }
            la[branch] = seq;
            stack.extend(self.vertices[i].parents.iter().copied());
        }
    }

    /// Element-wise maximum of the parents' highest-before clocks.
    pub fn merged_highest_before(&self, parents: &[EventId]) -> Vec<Seq> {
        let mut merged = vec![0; self.branches.len()];
        for p in parents {
            if let Some(i) = self.by_id.get(p) {
                for (slot, seq) in self.vertices[*i].highest_before.iter().enumerate() {
                    merged[slot] = merged[slot].max(*seq);
                }
            }
        }
        merged
    }

    /// Vector-clock slot of the branch `id` belongs to.
    pub fn branch_of(&self, id: &EventId) -> Option<usize> {
        self.vertex(id).map(|v| v.branch)
    }

    /// Highest-before clock of `id`.
    pub fn highest_before(&self, id: &EventId) -> Option<&[Seq]> {
        self.vertex(id).map(|v| v.highest_before.as_slice())
    }

    /// Observed seq of every validator, by validator index, in `clock`.
    pub fn observed_seqs(&self, clock: &[Seq]) -> Vec<ObservedSeq> {
        (0..self.validators.len())
            .map(|v| ObservedSeq {
                seq: self.creator_branches[v]
                    .iter()
                    .map(|b| clock.get(*b).copied().unwrap_or(0))
                    .max()
                    .unwrap_or(0),
                fork: self.fork_observed(clock, v),
            })
            .collect()
    }

    /// True if `clock` observes two conflicting branches of validator `v`.
    pub fn fork_observed(&self, clock: &[Seq], v: usize) -> bool {
        let branches = &self.creator_branches[v];
        if branches.len() < 2 {
            return false;
        }
        let seen = |b: usize| clock.get(b).copied().unwrap_or(0);
        for (i, &a) in branches.iter().enumerate() {
            for &b in &branches[i + 1..] {
                let (ha, hb) = (seen(a), seen(b));
                if ha == 0 || hb == 0 {
                    continue;
                }
                let start = self.branches[a].start_seq.max(self.branches[b].start_seq);
                if ha.min(hb) >= start {
                    return true;
                }
            }
        }
        false
    }

    fn reach_weight(&self, clock: &[Seq], target: &Vertex, exclude_forks: bool) -> u64 {
        let mut weight = 0u64;
        for v in 0..self.validators.len() {
            if exclude_forks && self.fork_observed(clock, v) {
                continue;
            }
            let reached = self.creator_branches[v].iter().any(|b| {
                let la = target.lowest_after.get(*b).copied().unwrap_or(0);
                let hb = clock.get(*b).copied().unwrap_or(0);
                la != 0 && la <= hb
            });
            if reached {
                weight += u64::from(self.validators.get_weight_by_idx(v));
            }
        }
        weight
    }

    /// True if an event with highest-before `clock` forklessly causes `b`:
    /// a quorum of non-forking validators observes `b` through their own
    /// events, and no fork of `b`'s creator is observed.
    pub fn forkless_cause(&self, clock: &[Seq], b: &EventId) -> bool {
        let Some(target) = self.vertex(b) else {
            return false;
        };
        if self.fork_observed(clock, target.creator_idx) {
            return false;
        }
        self.reach_weight(clock, target, true) >= self.validators.quorum()
    }

    /// True if a quorum of validators observes `b` in `clock`, forks
    /// included.
    pub fn strongly_reach(&self, clock: &[Seq], b: &EventId) -> bool {
        match self.vertex(b) {
            Some(target) => self.reach_weight(clock, target, false) >= self.validators.quorum(),
            None => false,
        }
    }

    /// Roots of `frame`.
    pub fn roots_of(&self, frame: Frame) -> impl Iterator<Item = &Vertex> + '_ {
        self.vertices
            .iter()
            .filter(move |v| v.is_root && v.frame == frame)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shared_types::Hash;

    /// Build headers with explicit parents; frame is the caller's choice.
    pub(crate) struct Builder {
        pub dag: DagIndex,
        last: HashMap<ValidatorId, (EventId, Seq)>,
        lamport: HashMap<EventId, Lamport>,
        salt: u64,
    }

    impl Builder {
        pub fn new(ids: &[ValidatorId]) -> Self {
            Self {
                dag: DagIndex::new(Validators::equal(ids, 1)),
                last: HashMap::new(),
                lamport: HashMap::new(),
                salt: 0,
            }
        }

        pub fn emit(&mut self, creator: ValidatorId, others: &[EventId], frame: Frame) -> EventId {
            let mut parents = Vec::new();
            let seq = match self.last.get(&creator) {
                Some((sp, seq)) => {
                    parents.push(*sp);
                    seq + 1
                }
                None => 1,
            };
            parents.extend_from_slice(others);
            self.push(creator, seq, parents, frame)
        }

        /// Event of `creator` on top of an explicit self-parent.
        pub fn fork(&mut self, creator: ValidatorId, self_parent: Option<(EventId, Seq)>) -> EventId {
            let (parents, seq) = match self_parent {
                Some((sp, seq)) => (vec![sp], seq + 1),
                None => (vec![], 1),
            };
            self.push(creator, seq, parents, 1)
        }

        fn push(&mut self, creator: ValidatorId, seq: Seq, parents: Vec<EventId>, frame: Frame) -> EventId {
            self.salt += 1;
            let lamport = parents
                .iter()
                .map(|p| self.lamport[p])
                .max()
                .unwrap_or(0)
                + 1;
            let header = EventHeader {
                version: 2,
                epoch: 1,
                seq,
                frame,
                lamport,
                creator,
                parents,
                creation_time: self.salt,
                payload_hash: Hash::from_low_u64_be(self.salt),
                ..Default::default()
            };
            self.dag.add(&header).unwrap();
            let id = header.id();
            self.lamport.insert(id, lamport);
            self.last.insert(creator, (id, seq));
            id
        }
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut dag = DagIndex::new(Validators::equal(&[1], 1));
        let header = EventHeader {
            epoch: 1,
            seq: 2,
            lamport: 2,
            creator: 1,
            parents: vec![EventId::zero()],
            ..Default::default()
        };
        assert_eq!(dag.add(&header), Err(AncestorError::UnknownParent(EventId::zero())));
    }

    #[test]
    fn test_heads_track_unreferenced_events() {
        let mut b = Builder::new(&[1, 2]);
        let a1 = b.emit(1, &[], 1);
        let b1 = b.emit(2, &[], 1);
        let a2 = b.emit(1, &[b1], 1);
        let heads: Vec<_> = b.dag.heads().copied().collect();
        assert_eq!(heads, vec![a2]);
        assert!(!b.dag.heads().any(|h| *h == a1));
        assert_eq!(b.dag.last_event_of(1), Some(a2));
    }

    #[test]
    fn test_forkless_cause_requires_quorum() {
        let mut b = Builder::new(&[1, 2, 3, 4]);
        let r: Vec<EventId> = (1..=4).map(|c| b.emit(c, &[], 1)).collect();
        // Every validator observes r[0]; then validator 1 sees them all.
        let s: Vec<EventId> = (2..=4).map(|c| b.emit(c, &[r[0]], 1)).collect();
        let top = b.emit(1, &s, 2);
        let clock = b.dag.highest_before(&top).unwrap().to_vec();
        assert!(b.dag.forkless_cause(&clock, &r[0]));
        // r[1] is only observed by validator 2 and through top by validator 1.
        assert!(!b.dag.forkless_cause(&clock, &r[1]));
        assert!(b.dag.strongly_reach(&clock, &r[0]));
    }

    #[test]
    fn test_fork_detected_and_excluded() {
        let mut b = Builder::new(&[1, 2, 3]);
        let a1 = b.fork(1, None);
        let a2 = b.fork(1, Some((a1, 1)));
        let a2_fork = b.fork(1, Some((a1, 1)));
        assert!(b.dag.cheaters().contains(&1));

        let x = b.emit(2, &[a2, a2_fork], 1);
        let clock = b.dag.highest_before(&x).unwrap().to_vec();
        assert!(b.dag.fork_observed(&clock, 0));
        assert!(b.dag.observed_seqs(&clock)[0].fork);
        assert!(!b.dag.forkless_cause(&clock, &a1));

        // Seeing only the shared prefix and one branch is not a fork.
        let y = b.emit(3, &[a2_fork], 1);
        let clock = b.dag.highest_before(&y).unwrap().to_vec();
        assert!(!b.dag.fork_observed(&clock, 0));
    }

    #[test]
    fn test_roots_by_frame() {
        let mut b = Builder::new(&[1, 2]);
        let a1 = b.emit(1, &[], 1);
        let _a2 = b.emit(1, &[], 1);
        let a3 = b.emit(1, &[], 2);
        let roots: Vec<_> = b.dag.roots_of(1).map(|v| v.id).collect();
        assert_eq!(roots, vec![a1]);
        let roots: Vec<_> = b.dag.roots_of(2).map(|v| v.id).collect();
        assert_eq!(roots, vec![a3]);
    }
}
