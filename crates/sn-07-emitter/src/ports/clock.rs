//! Time source.

use shared_types::UnixNanos;

/// Wall clock.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since the Unix epoch.
    fn now(&self) -> UnixNanos;
}
