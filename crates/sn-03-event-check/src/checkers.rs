//! # Checker Pipeline
//!
//! Light checks run inline in a fixed order; the heavy check runs on the
//! [`HeavyCheckPool`](crate::pool::HeavyCheckPool) or via
//! [`Checkers::validate_batch`].

use crate::domain::{basic, epoch, gas_power, heavy, parents, proposal};
use crate::error::{ParentsError, Result};
use crate::metrics::CheckMetrics;
use crate::ports::Reader;
use rayon::prelude::*;
use shared_crypto::SenderCache;
use shared_types::{EventHeader, EventPayload, ProposalSyncState};
use std::sync::Arc;
use tracing::debug;

/// All event checks bound to one reader.
pub struct Checkers {
    reader: Arc<dyn Reader>,
    senders: Arc<SenderCache>,
    metrics: Arc<CheckMetrics>,
}

impl Checkers {
    /// Create the pipeline.
    pub fn new(
        reader: Arc<dyn Reader>,
        senders: Arc<SenderCache>,
        metrics: Arc<CheckMetrics>,
    ) -> Self {
        Self {
            reader,
            senders,
            metrics,
        }
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Arc<CheckMetrics> {
        &self.metrics
    }

    /// Run basic, epoch, parents, gas power and proposal checks.
    ///
    /// Every parent must already be known to the reader.
    pub fn validate(&self, event: &EventPayload) -> Result<()> {
        let result = self.validate_light(event);
        self.record(event, &result);
        result
    }

    /// Run the heavy check: signature, senders, payload hash.
    pub fn validate_heavy(&self, event: &EventPayload) -> Result<()> {
        let epoch = self.reader.epoch_state();
        let result = heavy::validate(event, &epoch, &self.senders);
        self.record(event, &result);
        result
    }

    /// Light then heavy.
    pub fn validate_full(&self, event: &EventPayload) -> Result<()> {
        self.validate(event)?;
        self.validate_heavy(event)
    }

    /// Heavy-check many events in parallel. Results keep input order.
    pub fn validate_batch(&self, events: &[Arc<EventPayload>]) -> Vec<Result<()>> {
        let epoch = self.reader.epoch_state();
        events
            .par_iter()
            .map(|e| {
                let result = heavy::validate(e, &epoch, &self.senders);
                self.record(e, &result);
                result
            })
            .collect()
    }

    fn validate_light(&self, event: &EventPayload) -> Result<()> {
        basic::validate(event)?;

        let epoch_state = self.reader.epoch_state();
        epoch::validate(event, &epoch_state)?;

        let parent_events = event
            .parents()
            .iter()
            .map(|id| {
                self.reader
                    .event(id)
                    .ok_or(ParentsError::MissingParent(*id))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let parent_headers: Vec<&EventHeader> = parent_events.iter().map(|p| p.header()).collect();
        parents::validate(event.header(), &parent_headers, &epoch_state.validators)?;

        let self_parent = parent_headers
            .first()
            .copied()
            .filter(|p| p.creator == event.creator());
        gas_power::validate(event, self_parent, &epoch_state)?;

        let parent_states: Vec<ProposalSyncState> = parent_events
            .iter()
            .filter_map(|p| p.proposal_sync_state().copied())
            .collect();
        proposal::validate(event, &parent_states, &epoch_state, |n| {
            self.reader.block_hash(n)
        })?;
        Ok(())
    }

    fn record(&self, event: &EventPayload, result: &Result<()>) {
        match result {
            Ok(()) => self.metrics.record_accepted(),
            Err(err) => {
                self.metrics.record_rejection(err);
                debug!(
                    event = %event.id(),
                    kind = err.kind(),
                    error = %err,
                    "[sn-03] 🚫 Event rejected"
                );
            }
        }
    }
}
