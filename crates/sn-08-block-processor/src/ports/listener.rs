//! Confirmed event observers.

use shared_types::EventPayload;

/// Notified for every event a consensus block confirms, in commit order.
pub trait ConfirmedEventListener: Send + Sync {
    /// `event` was confirmed.
    fn on_event_confirmed(&self, event: &EventPayload);
}
