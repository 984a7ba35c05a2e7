//! # Emission Pacing
//!
//! How often a validator emits depends on what it has to carry, on the
//! network's health and on its stake: validators holding the top of the
//! stake distribution are needed for every frame and confirm quickly, the
//! long tail slows down to keep the DAG small.
//!
//! ```text
//! interval ratio (×1e6)
//! 3.9 ┤                                  ╭
//! 3.0 ┤                          ╭───────╯
//! 1.5 ┤                    ╭─────╯
//! 1.2 ┤                 ╭──╯
//! 1.0 ┼─────────────────╯
//!     └─────────────────┬────┬─────┬─────┬──▶ stake ranked above
//!                      0.78 0.80  0.90  1.0
//! ```

use shared_types::{EmitterRules, UnixNanos, ValidatorId, Validators, NANOS_PER_SEC};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Fixed-point unit of [`piecewise`] coordinates.
pub const DECIMAL_UNIT: u64 = 1_000_000;

/// Confirming interval multiplier by share of online stake ranked above.
pub const CONFIRMING_INTERVAL_DOTS: [(u64, u64); 5] = [
    (0, DECIMAL_UNIT),
    (780_000, 1_200_000),
    (800_000, 1_500_000),
    (900_000, 3_000_000),
    (DECIMAL_UNIT, 3_900_000),
];

/// Silence tolerated on top of four expected intervals.
pub const CHALLENGE_GRACE: UnixNanos = 4 * NANOS_PER_SEC;

/// Linear interpolation over `dots`, sorted by x. Clamps outside the range.
pub fn piecewise(x: u64, dots: &[(u64, u64)]) -> u64 {
    let Some(&(first_x, first_y)) = dots.first() else {
        return 0;
    };
    if x <= first_x {
        return first_y;
    }
    for pair in dots.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let span = (x1 - x0).max(1) as u128;
            let offset = (x - x0) as u128;
            let y = if y1 >= y0 {
                y0 as u128 + (y1 - y0) as u128 * offset / span
            } else {
                y0 as u128 - (y0 - y1) as u128 * offset / span
            };
            return y as u64;
        }
    }
    dots[dots.len() - 1].1
}

/// Expected confirming interval of every validator.
///
/// Validators are walked heaviest first; each one's ratio is the share of
/// online stake ranked above it. Offline validators still get an interval
/// but do not push the others down the curve.
pub fn confirming_intervals(
    validators: &Validators,
    offline: &BTreeSet<ValidatorId>,
    base: Duration,
) -> BTreeMap<ValidatorId, Duration> {
    let total = validators.total_weight().max(1) as u128;
    let mut above: u64 = 0;
    let mut out = BTreeMap::new();
    for (id, weight) in validators.iter() {
        let ratio = (above as u128 * DECIMAL_UNIT as u128 / total) as u64;
        if !offline.contains(&id) {
            above += u64::from(weight);
        }
        let factor = piecewise(ratio, &CONFIRMING_INTERVAL_DOTS);
        let nanos = base.as_nanos() * factor as u128 / DECIMAL_UNIT as u128;
        out.insert(id, Duration::from_nanos(nanos as u64));
    }
    out
}

/// Deadline after which a silent validator counts as offline.
pub fn challenge_deadline(now: UnixNanos, expected: Duration) -> UnixNanos {
    now.saturating_add(CHALLENGE_GRACE)
        .saturating_add(4 * expected.as_nanos() as UnixNanos)
}

/// Network-imposed minimum spacing of events, and whether the network is
/// considered stalled (no own event confirmed for `stall_threshold`).
pub fn emitter_interval_limit(
    rules: &EmitterRules,
    now: UnixNanos,
    last_confirmation: UnixNanos,
) -> (UnixNanos, bool) {
    if now > last_confirmation.saturating_add(rules.stall_threshold) {
        (rules.stalled_interval, true)
    } else {
        (rules.interval, false)
    }
}

/// `base` stretched by a uniform random share of up to `percent`.
pub fn jittered<R: rand::Rng>(base: Duration, percent: u64, rng: &mut R) -> Duration {
    if percent == 0 || base.is_zero() {
        return base;
    }
    let extra = rng.gen_range(0..=percent);
    base + base * extra as u32 / 100
}

/// Inputs of the emission decision.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Time since the self-parent was created; `None` for the first event.
    pub passed: Option<UnixNanos>,
    /// Network limit from [`emitter_interval_limit`].
    pub limit: UnixNanos,
    /// Configured minimum.
    pub min: Duration,
    /// Configured maximum.
    pub max: Duration,
    /// This validator's confirming interval.
    pub confirming: Duration,
    /// Something to originate: transactions, votes or a proposal.
    pub has_payload: bool,
    /// Others' payloads wait for confirmation.
    pub has_to_confirm: bool,
}

impl Pacing {
    /// True if spacing alone already rules out an event.
    pub fn too_early(&self) -> bool {
        match self.passed {
            None => false,
            Some(passed) => passed < self.limit || passed < self.min.as_nanos() as UnixNanos,
        }
    }

    /// True if an event is due.
    pub fn should_emit(&self) -> bool {
        if self.too_early() {
            return false;
        }
        let Some(passed) = self.passed else {
            return true;
        };
        if self.has_payload {
            return true;
        }
        if self.has_to_confirm && passed >= self.confirming.as_nanos() as UnixNanos {
            return true;
        }
        passed >= self.max.as_nanos() as UnixNanos
    }
}
