//! # DAG Events
//!
//! An event is immutable once signed. [`MutableEventPayload`] is the builder
//! the emitter fills in; [`MutableEventPayload::build`] seals it into an
//! [`EventPayload`] with its id computed once.
//!
//! ## Wire Layout
//!
//! ```text
//! [ header, body, signature ]
//!   header = [version, epoch, seq, frame, lamport, creator, parents,
//!             creation_time, median_time, gas_power_left, gas_power_used,
//!             extra, payload_hash]
//!   body   = v2: [txs, block_votes, epoch_vote, misbehaviour_proofs]
//!            v3: [payload]
//! ```
//!
//! Absent optional body items are encoded as empty lists.

use crate::errors::TypesError;
use crate::hashing::keccak256;
use crate::payload::{BlockVotes, EpochVote, MisbehaviourProof, Payload, ProposalSyncState};
use crate::primitives::{
    append_rlp_list, expect_list_len, rlp_fixed_bytes_at, rlp_list_at, EventId, Frame, Gas, Hash,
    Lamport, Seq, UnixNanos, ValidatorId, Epoch,
};
use crate::transaction::Transaction;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event version carrying transactions and LLR votes.
pub const EVENT_VERSION_2: u8 = 2;
/// Event version carrying the single-proposer payload.
pub const EVENT_VERSION_3: u8 = 3;

/// Index of the short-window gas power bucket.
pub const SHORT_TERM_GAS: usize = 0;
/// Index of the long-window gas power bucket.
pub const LONG_TERM_GAS: usize = 1;

/// Remaining gas power in both allocation windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GasPowerLeft {
    /// `[short, long]`.
    pub gas: [Gas; 2],
}

impl GasPowerLeft {
    /// Construct from both buckets.
    pub fn new(short: Gas, long: Gas) -> Self {
        Self { gas: [short, long] }
    }

    /// Smallest bucket.
    pub fn min(&self) -> Gas {
        self.gas[SHORT_TERM_GAS].min(self.gas[LONG_TERM_GAS])
    }

    /// Largest bucket.
    pub fn max(&self) -> Gas {
        self.gas[SHORT_TERM_GAS].max(self.gas[LONG_TERM_GAS])
    }

    /// Subtract `used` from both buckets, `None` if either underflows.
    pub fn sub(&self, used: Gas) -> Option<Self> {
        Some(Self {
            gas: [
                self.gas[SHORT_TERM_GAS].checked_sub(used)?,
                self.gas[LONG_TERM_GAS].checked_sub(used)?,
            ],
        })
    }
}

impl Encodable for GasPowerLeft {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.gas[SHORT_TERM_GAS]);
        s.append(&self.gas[LONG_TERM_GAS]);
    }
}

impl Decodable for GasPowerLeft {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 2)?;
        Ok(Self::new(rlp.val_at(0)?, rlp.val_at(1)?))
    }
}

/// 64-byte R‖S event signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSignature(pub [u8; 64]);

impl Default for EventSignature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Debug for EventSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventSignature(")?;
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Signed part of an event.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EventHeader {
    /// Encoding version, 2 or 3.
    pub version: u8,
    /// Epoch.
    pub epoch: Epoch,
    /// Per-creator sequence number, starting at 1.
    pub seq: Seq,
    /// Frame.
    pub frame: Frame,
    /// Lamport timestamp.
    pub lamport: Lamport,
    /// Creator validator.
    pub creator: ValidatorId,
    /// Parent ids, self-parent first when present.
    pub parents: Vec<EventId>,
    /// Creator's wall clock at creation.
    pub creation_time: UnixNanos,
    /// Stake-weighted median time of the creator's view.
    pub median_time: UnixNanos,
    /// Gas power left after this event.
    pub gas_power_left: GasPowerLeft,
    /// Gas power consumed by this event.
    pub gas_power_used: Gas,
    /// Free-form extra data.
    pub extra: Vec<u8>,
    /// Hash of the encoded body.
    pub payload_hash: Hash,
}

impl EventHeader {
    /// Self-parent id; events with `seq <= 1` have none.
    pub fn self_parent(&self) -> Option<&EventId> {
        if self.seq <= 1 {
            return None;
        }
        self.parents.first()
    }

    /// True if `id` is this event's self-parent.
    pub fn is_self_parent(&self, id: &EventId) -> bool {
        self.self_parent() == Some(id)
    }

    /// Digest covered by the creator's signature.
    pub fn hash_to_sign(&self) -> Hash {
        keccak256(&rlp::encode(self))
    }

    /// Event id derived from the header.
    pub fn id(&self) -> EventId {
        EventId::from_parts(self.epoch, self.lamport, &self.hash_to_sign())
    }
}

impl Encodable for EventHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(13);
        s.append(&self.version);
        s.append(&self.epoch);
        s.append(&self.seq);
        s.append(&self.frame);
        s.append(&self.lamport);
        s.append(&self.creator);
        append_rlp_list(s, &self.parents);
        s.append(&self.creation_time);
        s.append(&self.median_time);
        s.append(&self.gas_power_left);
        s.append(&self.gas_power_used);
        s.append(&self.extra);
        s.append(&self.payload_hash);
    }
}

impl Decodable for EventHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 13)?;
        Ok(Self {
            version: rlp.val_at(0)?,
            epoch: rlp.val_at(1)?,
            seq: rlp.val_at(2)?,
            frame: rlp.val_at(3)?,
            lamport: rlp.val_at(4)?,
            creator: rlp.val_at(5)?,
            parents: rlp_list_at(rlp, 6)?,
            creation_time: rlp.val_at(7)?,
            median_time: rlp.val_at(8)?,
            gas_power_left: rlp.val_at(9)?,
            gas_power_used: rlp.val_at(10)?,
            extra: rlp.val_at(11)?,
            payload_hash: rlp.val_at(12)?,
        })
    }
}

/// Unsealed event used while composing.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MutableEventPayload {
    /// Header fields.
    pub header: EventHeader,
    /// Version-2 transactions.
    pub txs: Vec<Transaction>,
    /// Version-2 LLR block votes.
    pub block_votes: Option<BlockVotes>,
    /// Version-2 LLR epoch vote.
    pub epoch_vote: Option<EpochVote>,
    /// Version-2 misbehaviour proofs.
    pub misbehaviour_proofs: Vec<MisbehaviourProof>,
    /// Version-3 payload.
    pub payload: Option<Payload>,
}

impl MutableEventPayload {
    /// Hash of the body as it would be encoded for `header.version`.
    pub fn compute_payload_hash(&self) -> Hash {
        let mut s = RlpStream::new();
        append_body(
            &mut s,
            self.header.version,
            &self.txs,
            &self.block_votes,
            &self.epoch_vote,
            &self.misbehaviour_proofs,
            &self.payload,
        );
        keccak256(&s.out())
    }

    /// Seal with `signature`, computing the id.
    pub fn build(self, signature: EventSignature) -> EventPayload {
        let id = self.header.id();
        EventPayload {
            header: self.header,
            signature,
            txs: self.txs,
            block_votes: self.block_votes,
            epoch_vote: self.epoch_vote,
            misbehaviour_proofs: self.misbehaviour_proofs,
            payload: self.payload,
            id,
        }
    }
}

/// A signed, immutable event with its body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventPayload {
    header: EventHeader,
    signature: EventSignature,
    txs: Vec<Transaction>,
    block_votes: Option<BlockVotes>,
    epoch_vote: Option<EpochVote>,
    misbehaviour_proofs: Vec<MisbehaviourProof>,
    payload: Option<Payload>,
    id: EventId,
}

impl EventPayload {
    /// Event id.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Signed header.
    pub fn header(&self) -> &EventHeader {
        &self.header
    }

    /// Creator signature.
    pub fn signature(&self) -> &EventSignature {
        &self.signature
    }

    /// Version-2 transactions.
    pub fn txs(&self) -> &[Transaction] {
        &self.txs
    }

    /// Version-2 block votes.
    pub fn block_votes(&self) -> Option<&BlockVotes> {
        self.block_votes.as_ref()
    }

    /// Version-2 epoch vote.
    pub fn epoch_vote(&self) -> Option<&EpochVote> {
        self.epoch_vote.as_ref()
    }

    /// Version-2 misbehaviour proofs.
    pub fn misbehaviour_proofs(&self) -> &[MisbehaviourProof] {
        &self.misbehaviour_proofs
    }

    /// Version-3 payload.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Version-3 sync state, `None` for version-2 events.
    pub fn proposal_sync_state(&self) -> Option<&ProposalSyncState> {
        self.payload.as_ref().map(|p| &p.proposal_sync_state)
    }

    /// True if any version-2 body field is populated.
    pub fn has_v2_fields(&self) -> bool {
        !self.txs.is_empty()
            || self.block_votes.is_some()
            || self.epoch_vote.is_some()
            || !self.misbehaviour_proofs.is_empty()
    }

    /// True if the event carries transactions or a proposal.
    pub fn has_txs_or_proposal(&self) -> bool {
        !self.txs.is_empty()
            || self
                .payload
                .as_ref()
                .map(|p| p.proposal.is_some())
                .unwrap_or(false)
    }

    /// Epoch shortcut.
    pub fn epoch(&self) -> Epoch {
        self.header.epoch
    }

    /// Creator shortcut.
    pub fn creator(&self) -> ValidatorId {
        self.header.creator
    }

    /// Seq shortcut.
    pub fn seq(&self) -> Seq {
        self.header.seq
    }

    /// Frame shortcut.
    pub fn frame(&self) -> Frame {
        self.header.frame
    }

    /// Lamport shortcut.
    pub fn lamport(&self) -> Lamport {
        self.header.lamport
    }

    /// Parents shortcut.
    pub fn parents(&self) -> &[EventId] {
        &self.header.parents
    }

    /// Self-parent shortcut.
    pub fn self_parent(&self) -> Option<&EventId> {
        self.header.self_parent()
    }

    /// Hash of the body as encoded.
    pub fn compute_payload_hash(&self) -> Hash {
        let mut s = RlpStream::new();
        append_body(
            &mut s,
            self.header.version,
            &self.txs,
            &self.block_votes,
            &self.epoch_vote,
            &self.misbehaviour_proofs,
            &self.payload,
        );
        keccak256(&s.out())
    }

    /// Copy back into a builder.
    pub fn to_mutable(&self) -> MutableEventPayload {
        MutableEventPayload {
            header: self.header.clone(),
            txs: self.txs.clone(),
            block_votes: self.block_votes.clone(),
            epoch_vote: self.epoch_vote,
            misbehaviour_proofs: self.misbehaviour_proofs.clone(),
            payload: self.payload.clone(),
        }
    }

    /// Wire encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Decode the wire encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(rlp::decode(bytes)?)
    }
}

impl Encodable for EventPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.header);
        append_body(
            s,
            self.header.version,
            &self.txs,
            &self.block_votes,
            &self.epoch_vote,
            &self.misbehaviour_proofs,
            &self.payload,
        );
        s.append(&self.signature.0.to_vec());
    }
}

impl Decodable for EventPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 3)?;
        let header: EventHeader = rlp.val_at(0)?;
        let body = rlp.at(1)?;
        let mut event = MutableEventPayload {
            header,
            ..Default::default()
        };
        match event.header.version {
            EVENT_VERSION_2 => {
                expect_list_len(&body, 4)?;
                event.txs = rlp_list_at(&body, 0)?;
                event.block_votes = decode_optional(&body.at(1)?)?;
                event.epoch_vote = decode_optional(&body.at(2)?)?;
                event.misbehaviour_proofs = rlp_list_at(&body, 3)?;
            }
            EVENT_VERSION_3 => {
                expect_list_len(&body, 1)?;
                event.payload = Some(body.val_at(0)?);
            }
            _ => return Err(DecoderError::Custom("unsupported event version")),
        }
        let signature = EventSignature(rlp_fixed_bytes_at::<64>(rlp, 2)?);
        Ok(event.build(signature))
    }
}

fn decode_optional<T: Decodable>(rlp: &Rlp) -> Result<Option<T>, DecoderError> {
    if rlp.is_list() && rlp.item_count()? == 0 {
        Ok(None)
    } else {
        Ok(Some(T::decode(rlp)?))
    }
}

fn append_optional<T: Encodable>(s: &mut RlpStream, value: &Option<T>) {
    match value {
        Some(v) => {
            s.append(v);
        }
        None => {
            s.begin_list(0);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn append_body(
    s: &mut RlpStream,
    version: u8,
    txs: &[Transaction],
    block_votes: &Option<BlockVotes>,
    epoch_vote: &Option<EpochVote>,
    misbehaviour_proofs: &[MisbehaviourProof],
    payload: &Option<Payload>,
) {
    if version == EVENT_VERSION_3 {
        s.begin_list(1);
        match payload {
            Some(p) => {
                s.append(p);
            }
            None => {
                s.append(&Payload::default());
            }
        }
        return;
    }
    s.begin_list(4);
    append_rlp_list(s, txs);
    append_optional(s, block_votes);
    append_optional(s, epoch_vote);
    append_rlp_list(s, misbehaviour_proofs);
}
