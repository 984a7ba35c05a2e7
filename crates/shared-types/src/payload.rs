//! # Event Payload Components
//!
//! Version-2 bodies carry transactions plus LLR votes and misbehaviour
//! proofs. Version-3 bodies carry a single [`Payload`]: the proposal sync
//! state and, at most once per turn, a block [`Proposal`].

use crate::hashing::keccak256;
use crate::primitives::{
    append_rlp_list, expect_list_len, rlp_fixed_bytes_at, rlp_list_at, BlockNumber, Epoch, Frame,
    Hash, UnixNanos,
};
use crate::transaction::Transaction;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use std::fmt;

/// Proposal turn counter.
pub type Turn = u32;

/// Observed proposal progress `(turn, frame, block)`.
///
/// Forms a join semilattice under component-wise maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ProposalSyncState {
    /// Turn of the latest observed proposal.
    pub last_seen_proposal_turn: Turn,
    /// Frame at which that turn was taken.
    pub last_seen_proposal_frame: Frame,
    /// Block number of the latest observed proposal.
    pub last_seen_proposed_block: BlockNumber,
}

impl ProposalSyncState {
    /// Component-wise maximum.
    pub fn join(&self, other: &Self) -> Self {
        Self {
            last_seen_proposal_turn: self.last_seen_proposal_turn.max(other.last_seen_proposal_turn),
            last_seen_proposal_frame: self
                .last_seen_proposal_frame
                .max(other.last_seen_proposal_frame),
            last_seen_proposed_block: self
                .last_seen_proposed_block
                .max(other.last_seen_proposed_block),
        }
    }

    /// Join of `base` with every state in `states`.
    pub fn join_all<'a, I>(base: Self, states: I) -> Self
    where
        I: IntoIterator<Item = &'a ProposalSyncState>,
    {
        states.into_iter().fold(base, |acc, s| acc.join(s))
    }
}

impl Encodable for ProposalSyncState {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.last_seen_proposal_turn);
        s.append(&self.last_seen_proposal_frame);
        s.append(&self.last_seen_proposed_block);
    }
}

impl Decodable for ProposalSyncState {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 3)?;
        Ok(Self {
            last_seen_proposal_turn: rlp.val_at(0)?,
            last_seen_proposal_frame: rlp.val_at(1)?,
            last_seen_proposed_block: rlp.val_at(2)?,
        })
    }
}

/// 64-byte R‖S signature revealing the proposer's randomness.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RandaoReveal(pub [u8; 64]);

impl Default for RandaoReveal {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Debug for RandaoReveal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandaoReveal(")?;
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}

impl RandaoReveal {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// A full block proposal embedded in a version-3 event.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Proposal {
    /// Proposed block height.
    pub number: BlockNumber,
    /// Hash of the block this one extends.
    pub parent_hash: Hash,
    /// Proposed block time.
    pub time: UnixNanos,
    /// Ordered block transactions.
    pub transactions: Vec<Transaction>,
    /// Proposer RANDAO reveal.
    pub randao_reveal: RandaoReveal,
}

impl Proposal {
    /// Keccak-256 of the RLP encoding; breaks ties between proposals.
    pub fn hash(&self) -> Hash {
        keccak256(&rlp::encode(self))
    }

    /// Total encoded size of the proposed transactions.
    pub fn transactions_size(&self) -> u64 {
        self.transactions.iter().map(|tx| tx.size()).sum()
    }
}

impl Encodable for Proposal {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5);
        s.append(&self.number);
        s.append(&self.parent_hash);
        s.append(&self.time);
        append_rlp_list(s, &self.transactions);
        s.append(&self.randao_reveal.0.to_vec());
    }
}

impl Decodable for Proposal {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 5)?;
        Ok(Self {
            number: rlp.val_at(0)?,
            parent_hash: rlp.val_at(1)?,
            time: rlp.val_at(2)?,
            transactions: rlp_list_at(rlp, 3)?,
            randao_reveal: RandaoReveal(rlp_fixed_bytes_at::<64>(rlp, 4)?),
        })
    }
}

/// Version-3 event payload.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Payload {
    /// Proposal progress as seen by the creator.
    pub proposal_sync_state: ProposalSyncState,
    /// Proposal made by this event, if any.
    pub proposal: Option<Proposal>,
}

impl Encodable for Payload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.proposal_sync_state);
        match &self.proposal {
            Some(p) => {
                s.append(p);
            }
            None => {
                s.begin_list(0);
            }
        }
    }
}

impl Decodable for Payload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 2)?;
        let proposal_item = rlp.at(1)?;
        let proposal = if proposal_item.item_count()? == 0 {
            None
        } else {
            Some(Proposal::decode(&proposal_item)?)
        };
        Ok(Self {
            proposal_sync_state: rlp.val_at(0)?,
            proposal,
        })
    }
}

/// LLR block votes: hashes of consecutive blocks starting at `start`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BlockVotes {
    /// First voted block.
    pub start: BlockNumber,
    /// Epoch of the voted blocks.
    pub epoch: Epoch,
    /// Voted block record hashes.
    pub votes: Vec<Hash>,
}

impl BlockVotes {
    /// Last voted block, `None` if there are no votes.
    pub fn last_block(&self) -> Option<BlockNumber> {
        if self.votes.is_empty() {
            None
        } else {
            Some(self.start + self.votes.len() as u64 - 1)
        }
    }
}

impl Encodable for BlockVotes {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.start);
        s.append(&self.epoch);
        append_rlp_list(s, &self.votes);
    }
}

impl Decodable for BlockVotes {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 3)?;
        Ok(Self {
            start: rlp.val_at(0)?,
            epoch: rlp.val_at(1)?,
            votes: rlp_list_at(rlp, 2)?,
        })
    }
}

/// LLR epoch vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EpochVote {
    /// Voted epoch.
    pub epoch: Epoch,
    /// Epoch record hash.
    pub vote: Hash,
}

impl Encodable for EpochVote {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.epoch);
        s.append(&self.vote);
    }
}

impl Decodable for EpochVote {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 2)?;
        Ok(Self {
            epoch: rlp.val_at(0)?,
            vote: rlp.val_at(1)?,
        })
    }
}

/// Opaque evidence of validator misbehaviour.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MisbehaviourProof {
    /// Proof kind discriminant.
    pub kind: u8,
    /// Kind-specific encoded evidence.
    pub data: Vec<u8>,
}

impl Encodable for MisbehaviourProof {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.kind);
        s.append(&self.data);
    }
}

impl Decodable for MisbehaviourProof {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 2)?;
        Ok(Self {
            kind: rlp.val_at(0)?,
            data: rlp.val_at(1)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(turn: Turn, frame: Frame, block: BlockNumber) -> ProposalSyncState {
        ProposalSyncState {
            last_seen_proposal_turn: turn,
            last_seen_proposal_frame: frame,
            last_seen_proposed_block: block,
        }
    }

    #[test]
    fn test_join_is_componentwise_max() {
        let a = state(3, 10, 5);
        let b = state(4, 8, 6);
        assert_eq!(a.join(&b), state(4, 10, 6));
    }

    #[test]
    fn test_join_all_with_base() {
        let base = state(0, 0, 9);
        let parents = [state(1, 3, 7), state(2, 2, 8)];
        assert_eq!(ProposalSyncState::join_all(base, parents.iter()), state(2, 3, 9));
    }

    #[test]
    fn test_payload_without_proposal_rlp() {
        let payload = Payload {
            proposal_sync_state: state(1, 2, 3),
            proposal: None,
        };
        let decoded: Payload = rlp::decode(&rlp::encode(&payload)).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_proposal_hash_depends_on_content() {
        let a = Proposal {
            number: 5,
            ..Default::default()
        };
        let b = Proposal {
            number: 6,
            ..Default::default()
        };
        assert_ne!(a.hash(), b.hash());
    }

    fn arb_state() -> impl Strategy<Value = ProposalSyncState> {
        (0u32..50, 0u32..50, 0u64..50).prop_map(|(t, f, b)| state(t, f, b))
    }

    proptest! {
        #[test]
        fn prop_join_idempotent(a in arb_state()) {
            prop_assert_eq!(a.join(&a), a);
        }

        #[test]
        fn prop_join_commutative(a in arb_state(), b in arb_state()) {
            prop_assert_eq!(a.join(&b), b.join(&a));
        }

        #[test]
        fn prop_join_associative(a in arb_state(), b in arb_state(), c in arb_state()) {
            prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        }

        #[test]
        fn prop_join_monotone(a in arb_state(), b in arb_state()) {
            let j = a.join(&b);
            prop_assert!(j.last_seen_proposal_turn >= a.last_seen_proposal_turn);
            prop_assert!(j.last_seen_proposal_frame >= a.last_seen_proposal_frame);
            prop_assert!(j.last_seen_proposed_block >= a.last_seen_proposed_block);
        }
    }
}
