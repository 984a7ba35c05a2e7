//! # Event Payload
//!
//! Pure helpers used while composing an event: its median time, the
//! origination turn of pooled transactions, the gas budget and the version
//! tag in extra data.

use shared_types::{
    keccak256_concat, Address, EventHeader, Gas, GasPowerLeft, Hash, MutableEventPayload, Rules,
    UnixNanos, ValidatorId, Validators,
};
use sn_03_event_check::calc_gas_power_used_mutable;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Stake-weighted median of the latest creation time seen per validator.
///
/// `own` is this validator's clock reading; parents contribute their
/// creators' times. Validators without a sample are ignored.
pub fn median_time(
    me: ValidatorId,
    own: UnixNanos,
    parents: &[&EventHeader],
    validators: &Validators,
) -> UnixNanos {
    let mut latest: BTreeMap<ValidatorId, UnixNanos> = BTreeMap::new();
    for p in parents {
        let t = latest.entry(p.creator).or_default();
        *t = (*t).max(p.creation_time);
    }
    latest.insert(me, own);

    let mut samples: Vec<(UnixNanos, u64)> = latest
        .into_iter()
        .map(|(id, t)| (t, u64::from(validators.get_weight_by_id(id))))
        .filter(|(_, w)| *w > 0)
        .collect();
    if samples.is_empty() {
        return own;
    }
    samples.sort_unstable();
    let total: u64 = samples.iter().map(|(_, w)| w).sum();
    let mut acc = 0;
    for (t, w) in &samples {
        acc += w;
        if acc * 2 >= total {
            return *t;
        }
    }
    own
}

/// Consecutive nonces of one sender sharing an origination turn.
pub const TX_TURN_NONCES: u64 = 32;

/// Turn seed of a transaction. Runs of [`TX_TURN_NONCES`] nonces from one
/// sender share a seed so they are originated by the same validator.
pub fn turn_seed(sender: &Address, nonce: u64) -> Hash {
    keccak256_concat(&[sender.as_bytes(), &(nonce / TX_TURN_NONCES).to_be_bytes()])
}

/// Validator expected to originate a pooled transaction.
///
/// The first turn goes to a validator picked by `seed`; every `period` the
/// turn moves to the next online validator in stake order.
pub fn tx_turn(
    seed: &Hash,
    validators: &Validators,
    offline: &BTreeSet<ValidatorId>,
    waited: UnixNanos,
    period: Duration,
) -> Option<ValidatorId> {
    let online: Vec<ValidatorId> = validators
        .sorted_ids()
        .iter()
        .copied()
        .filter(|id| !offline.contains(id))
        .collect();
    let candidates = if online.is_empty() {
        validators.sorted_ids()
    } else {
        &online
    };
    if candidates.is_empty() {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&seed.as_bytes()[24..]);
    let rounds = waited / (period.as_nanos() as UnixNanos).max(1);
    let slot = u64::from_be_bytes(low).wrapping_add(rounds) % candidates.len() as u64;
    Some(candidates[slot as usize])
}

/// Fit `event` into the gas budget by dropping transactions from the end.
///
/// The budget is the smaller of the lower gas power window and
/// `max_event_gas`. Returns the gas the event uses, or `None` if even the
/// transaction-free event does not fit.
pub fn fit_gas(event: &mut MutableEventPayload, rules: &Rules, available: &GasPowerLeft) -> Option<Gas> {
    let budget = available.min().min(rules.economy.gas.max_event_gas);
    loop {
        let used = calc_gas_power_used_mutable(event, rules);
        if used <= budget {
            return Some(used);
        }
        event.txs.pop()?;
    }
}

/// Node version as carried in the extra data of the first event after start.
pub fn version_extra() -> Vec<u8> {
    let part = |s: &str| s.parse::<u64>().unwrap_or(0);
    let major = part(env!("CARGO_PKG_VERSION_MAJOR"));
    let minor = part(env!("CARGO_PKG_VERSION_MINOR"));
    let patch = part(env!("CARGO_PKG_VERSION_PATCH"));
    ((major << 48) | (minor << 32) | (patch << 16))
        .to_be_bytes()
        .to_vec()
}
