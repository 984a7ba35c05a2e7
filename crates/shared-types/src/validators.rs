//! # Validator Set
//!
//! Immutable, weight-sorted validator set. Ordering is by weight descending,
//! then id ascending, so every node iterates validators identically.

use crate::primitives::ValidatorId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Stake weight of one validator.
pub type Weight = u32;

/// Weighted validator set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(ValidatorId, Weight)>", into = "Vec<(ValidatorId, Weight)>")]
pub struct Validators {
    ids: Vec<ValidatorId>,
    weights: Vec<Weight>,
    total: u64,
    index: HashMap<ValidatorId, usize>,
}

impl Validators {
    /// Build from `(id, weight)` pairs. Zero weights are dropped, duplicate
    /// ids keep the last weight.
    pub fn new<I: IntoIterator<Item = (ValidatorId, Weight)>>(entries: I) -> Self {
        let mut builder = ValidatorsBuilder::new();
        for (id, weight) in entries {
            builder.set(id, weight);
        }
        builder.build()
    }

    /// Equal weight for every id.
    pub fn equal(ids: &[ValidatorId], weight: Weight) -> Self {
        Self::new(ids.iter().map(|id| (*id, weight)))
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sum of weights.
    pub fn total_weight(&self) -> u64 {
        self.total
    }

    /// Strict supermajority: `total·2/3 + 1`.
    pub fn quorum(&self) -> u64 {
        self.total * 2 / 3 + 1
    }

    /// True if `id` is a member.
    pub fn exists(&self, id: ValidatorId) -> bool {
        self.index.contains_key(&id)
    }

    /// Position of `id` in sorted order.
    pub fn get_idx(&self, id: ValidatorId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Id at sorted position `idx`.
    pub fn get_id(&self, idx: usize) -> Option<ValidatorId> {
        self.ids.get(idx).copied()
    }

    /// Weight of `id`, zero for non-members.
    pub fn get_weight_by_id(&self, id: ValidatorId) -> Weight {
        self.get_idx(id).map(|i| self.weights[i]).unwrap_or(0)
    }

    /// Weight at sorted position `idx`.
    pub fn get_weight_by_idx(&self, idx: usize) -> Weight {
        self.weights.get(idx).copied().unwrap_or(0)
    }

    /// Ids in sorted order.
    pub fn sorted_ids(&self) -> &[ValidatorId] {
        &self.ids
    }

    /// Weights in sorted order.
    pub fn sorted_weights(&self) -> &[Weight] {
        &self.weights
    }

    /// `(id, weight)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (ValidatorId, Weight)> + '_ {
        self.ids.iter().copied().zip(self.weights.iter().copied())
    }

    /// Start a builder seeded with this set.
    pub fn to_builder(&self) -> ValidatorsBuilder {
        let mut b = ValidatorsBuilder::new();
        for (id, w) in self.iter() {
            b.set(id, w);
        }
        b
    }
}

impl From<Vec<(ValidatorId, Weight)>> for Validators {
    fn from(entries: Vec<(ValidatorId, Weight)>) -> Self {
        Self::new(entries)
    }
}

impl From<Validators> for Vec<(ValidatorId, Weight)> {
    fn from(v: Validators) -> Self {
        v.iter().collect()
    }
}

/// Mutable accumulator for [`Validators`].
#[derive(Clone, Debug, Default)]
pub struct ValidatorsBuilder {
    weights: BTreeMap<ValidatorId, Weight>,
}

impl ValidatorsBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the weight of `id`; zero removes it.
    pub fn set(&mut self, id: ValidatorId, weight: Weight) -> &mut Self {
        if weight == 0 {
            self.weights.remove(&id);
        } else {
            self.weights.insert(id, weight);
        }
        self
    }

    /// Sort and freeze.
    pub fn build(&self) -> Validators {
        let mut entries: Vec<(ValidatorId, Weight)> =
            self.weights.iter().map(|(id, w)| (*id, *w)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let ids: Vec<ValidatorId> = entries.iter().map(|e| e.0).collect();
        let weights: Vec<Weight> = entries.iter().map(|e| e.1).collect();
        let total = weights.iter().map(|w| *w as u64).sum();
        let index = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Validators {
            ids,
            weights,
            total,
            index,
        }
    }
}
