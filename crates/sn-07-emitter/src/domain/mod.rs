//! Emitter domain: pacing, double-sign protection, persistence of the
//! emitter's own state and payload helpers.

pub mod double_sign;
pub mod error_lock;
pub mod intervals;
pub mod payload;
pub mod prev_emitted;
pub mod proposal;

pub use double_sign::{detect_parallel_instance, synced_to_emit, NotSynced, SyncStatus};
pub use error_lock::{ErrorLock, ERROR_LOCK_FILE};
pub use intervals::{
    challenge_deadline, confirming_intervals, emitter_interval_limit, jittered, piecewise, Pacing,
};
pub use payload::{fit_gas, median_time, turn_seed, tx_turn, version_extra, TX_TURN_NONCES};
pub use prev_emitted::PrevEmitted;
pub use proposal::{build_proposal, proposal_size_limit, wants_proposal};
