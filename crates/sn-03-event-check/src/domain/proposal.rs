//! # Proposal Check
//!
//! Version-3 events carry a payload with the creator's view of proposal
//! progress. The view must be the join of the parents' views, unless the
//! creator takes the next turn, in which case it must attach a proposal
//! for the next block.

use crate::error::ProposalError;
use shared_types::{
    BlockNumber, EpochState, EventPayload, Hash, ProposalSyncState, EVENT_VERSION_3,
    MAX_PROPOSAL_TX_SIZE,
};
use sn_05_proposer::{incoming_state, validate_turn};

/// Validate the payload of `event`.
///
/// `parent_states` are the sync states of the parents that carry one.
/// `block_hash` resolves locally known blocks; an unknown parent block
/// defers the parent-hash check to block assembly.
pub fn validate<F>(
    event: &EventPayload,
    parent_states: &[ProposalSyncState],
    epoch: &EpochState,
    block_hash: F,
) -> Result<(), ProposalError>
where
    F: Fn(BlockNumber) -> Option<Hash>,
{
    if event.header().version != EVENT_VERSION_3 {
        return Ok(());
    }
    if event.has_v2_fields() {
        return Err(ProposalError::HasV2Fields);
    }
    let payload = event.payload().ok_or(ProposalError::MissingPayload)?;

    let incoming = incoming_state(epoch.epoch_start_block, parent_states.iter());
    if payload.proposal_sync_state == incoming {
        if payload.proposal.is_some() {
            return Err(ProposalError::UnexpectedProposal);
        }
        return Ok(());
    }

    let proposal = payload
        .proposal
        .as_ref()
        .ok_or(ProposalError::MissingProposal)?;
    validate_turn(
        &epoch.validators,
        &incoming,
        &payload.proposal_sync_state,
        event.frame(),
        event.creator(),
    )?;

    let expected = payload.proposal_sync_state.last_seen_proposed_block;
    if proposal.number != expected {
        return Err(ProposalError::WrongBlockNumber {
            got: proposal.number,
            expected,
        });
    }
    if let Some(parent) = block_hash(proposal.number - 1) {
        if parent != proposal.parent_hash {
            return Err(ProposalError::WrongParentHash);
        }
    }
    let size = proposal.transactions_size();
    if size > MAX_PROPOSAL_TX_SIZE {
        return Err(ProposalError::TooLarge {
            size,
            max: MAX_PROPOSAL_TX_SIZE,
        });
    }
    Ok(())
}
