//! # Proposal Extraction
//!
//! Several proposals for the same block may be confirmed by one Atropos.
//! The canonical one targets `last_block + 1` on top of the known parent
//! hash and has the lowest turn; equal turns break on the lower proposal
//! hash.

use shared_types::{BlockNumber, Hash, Proposal, Turn, ValidatorId};

/// A proposal found in a confirmed event.
#[derive(Debug, Clone, Copy)]
pub struct ProposalCandidate<'a> {
    /// Turn claimed by the carrying event.
    pub turn: Turn,
    /// Creator of the carrying event.
    pub proposer: ValidatorId,
    /// The proposal itself.
    pub proposal: &'a Proposal,
}

/// Pick the canonical proposal for the block after `last_block`.
pub fn select_proposal<'a, I>(
    candidates: I,
    last_block: BlockNumber,
    last_block_hash: &Hash,
) -> Option<ProposalCandidate<'a>>
where
    I: IntoIterator<Item = ProposalCandidate<'a>>,
{
    candidates
        .into_iter()
        .filter(|c| {
            c.proposal.number == last_block + 1 && c.proposal.parent_hash == *last_block_hash
        })
        .map(|c| (c.turn, c.proposal.hash(), c))
        .min_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)))
        .map(|(_, _, c)| c)
}
