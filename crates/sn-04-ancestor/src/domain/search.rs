//! # Parent Search
//!
//! Parents are picked greedily, one slot at a time. Each slot carries a
//! strategy; the option maximizing that strategy's metric of
//! `chosen ++ [option]` wins the slot. Ties go to the lower event id so every
//! run over the same DAG picks the same parents.

use super::Metric;
use rand::Rng;
use shared_types::EventId;

/// Strategy filling one parent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Maximize payload-lamport.
    Payload,
    /// Maximize root knowledge.
    Progress,
    /// Maximize quorum progress.
    Quorum,
    /// Uniformly random option.
    Random,
}

/// Slot plan for `slots` free parent slots: one payload slot, up to half
/// random slots, the rest split between progress and quorum.
pub fn plan_strategies(slots: usize) -> Vec<SearchStrategy> {
    if slots == 0 {
        return Vec::new();
    }
    let mut plan = vec![SearchStrategy::Payload];
    let rest = slots - 1;
    let random = rest / 2;
    for i in 0..rest - random {
        plan.push(if i % 2 == 0 {
            SearchStrategy::Progress
        } else {
            SearchStrategy::Quorum
        });
    }
    plan.extend(std::iter::repeat(SearchStrategy::Random).take(random));
    plan
}

/// Greedily extend `existing` with options according to `plan`.
///
/// `metric` scores a full candidate parent list under a strategy. Random
/// slots draw from `rng`.
pub fn choose_parents<F, R>(
    existing: &[EventId],
    options: &[EventId],
    plan: &[SearchStrategy],
    mut metric: F,
    rng: &mut R,
) -> Vec<EventId>
where
    F: FnMut(SearchStrategy, &[EventId]) -> Metric,
    R: Rng + ?Sized,
{
    let mut chosen: Vec<EventId> = existing.to_vec();
    let mut remaining: Vec<EventId> = options
        .iter()
        .filter(|o| !existing.contains(o))
        .copied()
        .collect();
    remaining.sort();
    remaining.dedup();

    for strategy in plan {
        if remaining.is_empty() {
            break;
        }
        let pick = match strategy {
            SearchStrategy::Random => rng.gen_range(0..remaining.len()),
            _ => {
                let mut best = 0;
                let mut best_metric = None;
                for (i, option) in remaining.iter().enumerate() {
                    chosen.push(*option);
                    let m = metric(*strategy, &chosen);
                    chosen.pop();
                    if best_metric.map_or(true, |b| m > b) {
                        best = i;
                        best_metric = Some(m);
                    }
                }
                best
            }
        };
        chosen.push(remaining.remove(pick));
    }
    chosen
}
