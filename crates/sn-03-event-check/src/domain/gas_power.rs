//! # Gas Power
//!
//! Every validator accrues gas power in two windows (short and long term)
//! at a rate proportional to its stake, and spends it on the events it
//! creates.
//!
//! ```text
//!   per_sec  = max(alloc_per_sec · weight / total, min_ensured_alloc)
//!   max      = max(per_sec · max_alloc_period / 1s, startup)
//!   startup  = max(per_sec · startup_alloc_period / 1s, min_startup_gas)
//!   gas      = min(prev_left + (median_time - prev_time) · per_sec / 1s, max)
//! ```
//!
//! `prev` is the self-parent; the first event of an epoch continues from the
//! creator's last event of the previous epoch, or from zero at epoch start,
//! and is lifted to at least `startup`.

use crate::error::{EpochError, GasPowerError};
use shared_types::{
    BlockVotes, EpochState, EventHeader, EventPayload, Gas, GasPowerLeft, GasPowerRules,
    MutableEventPayload, Rules, Transaction, UnixNanos, ValidatorId, NANOS_PER_SEC,
};

fn mul_div(a: u64, b: u64, c: u64) -> u64 {
    if c == 0 {
        return 0;
    }
    let v = u128::from(a) * u128::from(b) / u128::from(c);
    u64::try_from(v).unwrap_or(u64::MAX)
}

/// Gas power a validator may spend per second in one window.
pub fn alloc_per_sec(rules: &GasPowerRules, weight: u64, total: u64) -> u64 {
    mul_div(rules.alloc_per_sec, weight, total).max(rules.min_ensured_alloc)
}

/// Gas power available to an event of `creator` before it spends anything.
pub fn calc_gas_power(
    epoch: &EpochState,
    creator: ValidatorId,
    self_parent: Option<&EventHeader>,
    median_time: UnixNanos,
) -> GasPowerLeft {
    let weight = u64::from(epoch.validators.get_weight_by_id(creator));
    let total = epoch.validators.total_weight();
    let prev_epoch_event = epoch.validator_state(creator).prev_epoch_event;

    let mut out = GasPowerLeft::default();
    for (window, slot) in out.gas.iter_mut().enumerate() {
        let rules = epoch.rules.economy.gas_power(window);
        let per_sec = alloc_per_sec(rules, weight, total);
        let startup = mul_div(per_sec, rules.startup_alloc_period, NANOS_PER_SEC)
            .max(rules.min_startup_gas);
        let max = mul_div(per_sec, rules.max_alloc_period, NANOS_PER_SEC).max(startup);

        let (mut prev_gas, mut prev_time) = match self_parent {
            Some(sp) => (sp.gas_power_left.gas[window], sp.median_time),
            None if !prev_epoch_event.id.is_zero() => (
                prev_epoch_event.gas_power_left.gas[window],
                prev_epoch_event.time,
            ),
            None => (0, epoch.epoch_start),
        };
        if self_parent.is_none() {
            prev_gas = prev_gas.max(startup);
        }
        prev_time = prev_time.min(median_time);

        let allocated = mul_div(median_time - prev_time, per_sec, NANOS_PER_SEC);
        *slot = prev_gas.saturating_add(allocated).min(max);
    }
    out
}

fn calc_used(
    rules: &Rules,
    parents: usize,
    extra: usize,
    txs: &[Transaction],
    block_votes: Option<&BlockVotes>,
    epoch_vote: bool,
    misbehaviour_proofs: usize,
) -> Gas {
    let gas = &rules.economy.gas;
    let free = rules.dag.max_free_parents as usize;
    let mut used: Gas = gas.event_gas;
    used = used.saturating_add(txs.iter().map(|tx| tx.gas).fold(0, Gas::saturating_add));
    used = used.saturating_add(gas.parent_gas.saturating_mul(parents.saturating_sub(free) as Gas));
    used = used.saturating_add(gas.extra_data_gas.saturating_mul(extra as Gas));
    if let Some(bvs) = block_votes {
        used = used.saturating_add(gas.block_votes_base_gas);
        used = used.saturating_add(gas.block_vote_gas.saturating_mul(bvs.votes.len() as Gas));
    }
    if epoch_vote {
        used = used.saturating_add(gas.epoch_vote_gas);
    }
    used.saturating_add(gas.misbehaviour_proof_gas.saturating_mul(misbehaviour_proofs as Gas))
}

/// Gas power a signed event must declare as used.
pub fn calc_gas_power_used(event: &EventPayload, rules: &Rules) -> Gas {
    calc_used(
        rules,
        event.parents().len(),
        event.header().extra.len(),
        event.txs(),
        event.block_votes(),
        event.epoch_vote().is_some(),
        event.misbehaviour_proofs().len(),
    )
}

/// Gas power an event under construction will use.
pub fn calc_gas_power_used_mutable(event: &MutableEventPayload, rules: &Rules) -> Gas {
    calc_used(
        rules,
        event.header.parents.len(),
        event.header.extra.len(),
        &event.txs,
        event.block_votes.as_ref(),
        event.epoch_vote.is_some(),
        event.misbehaviour_proofs.len(),
    )
}

/// Check the declared gas use against rules.
pub fn check_gas_used(event: &EventPayload, rules: &Rules) -> Result<(), EpochError> {
    let h = event.header();
    if h.gas_power_used > rules.economy.gas.max_event_gas {
        return Err(EpochError::TooBigGasUsed {
            got: h.gas_power_used,
            max: rules.economy.gas.max_event_gas,
        });
    }
    let expected = calc_gas_power_used(event, rules);
    if h.gas_power_used != expected {
        return Err(EpochError::WrongGasUsed {
            got: h.gas_power_used,
            expected,
        });
    }
    Ok(())
}

/// Check the declared gas power left against the allocation.
pub fn validate(
    event: &EventPayload,
    self_parent: Option<&EventHeader>,
    epoch: &EpochState,
) -> Result<(), GasPowerError> {
    let h = event.header();
    let available = calc_gas_power(epoch, h.creator, self_parent, h.median_time);
    for window in 0..available.gas.len() {
        let got = h.gas_power_left.gas[window];
        let expected = available.gas[window];
        if got.checked_add(h.gas_power_used) != Some(expected) {
            if expected < h.gas_power_used {
                return Err(GasPowerError::NotEnoughGasPower);
            }
            return Err(GasPowerError::WrongGasPowerLeft {
                window,
                got,
                used: h.gas_power_used,
                expected,
            });
        }
    }
    Ok(())
}
