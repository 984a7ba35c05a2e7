//! # Chain Primitives
//!
//! Scalar aliases, the event identifier and the RLP helpers every other
//! module builds on.
//!
//! ## Event Identity
//!
//! An [`EventId`] is the Keccak-256 digest of the canonical event header with
//! its first eight bytes overwritten by the big-endian epoch and lamport:
//!
//! ```text
//! [ epoch: 4 ][ lamport: 4 ][ keccak(header)[8..32] ]
//! ```
//!
//! Sorting ids therefore sorts events by `(epoch, lamport)` first.

use primitive_types::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use primitive_types::{H160, U256};

/// A 32-byte Keccak or SHA-256 digest.
pub type Hash = H256;

/// A 20-byte account address.
pub type Address = H160;

/// Validator identifier assigned by the staking contract.
pub type ValidatorId = u32;

/// Epoch number.
pub type Epoch = u32;

/// Per-creator sequence number of an event.
pub type Seq = u32;

/// DAG frame number within an epoch.
pub type Frame = u32;

/// Lamport timestamp of an event.
pub type Lamport = u32;

/// Block height.
pub type BlockNumber = u64;

/// Gas amount.
pub type Gas = u64;

/// Unix time in nanoseconds.
pub type UnixNanos = u64;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds per millisecond.
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Identifier of a DAG event.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EventId(pub H256);

impl EventId {
    /// Build an id from a header digest, stamping epoch and lamport into the
    /// first eight bytes.
    pub fn from_parts(epoch: Epoch, lamport: Lamport, digest: &H256) -> Self {
        let mut bytes = digest.to_fixed_bytes();
        bytes[0..4].copy_from_slice(&epoch.to_be_bytes());
        bytes[4..8].copy_from_slice(&lamport.to_be_bytes());
        Self(H256(bytes))
    }

    /// The all-zero id.
    pub fn zero() -> Self {
        Self(H256::zero())
    }

    /// True for the all-zero id.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Epoch encoded in the id.
    pub fn epoch(&self) -> Epoch {
        let b = self.0.as_bytes();
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Lamport timestamp encoded in the id.
    pub fn lamport(&self) -> Lamport {
        let b = self.0.as_bytes();
        u32::from_be_bytes([b[4], b[5], b[6], b[7]])
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The pseudo-random part of the id (bytes 8..32).
    pub fn random_part(&self) -> &[u8] {
        &self.0.as_bytes()[8..]
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.as_bytes();
        write!(
            f,
            "{}:{}:{:02x}{:02x}{:02x}{:02x}",
            self.epoch(),
            self.lamport(),
            b[8],
            b[9],
            b[10],
            b[11]
        )
    }
}

impl Encodable for EventId {
    fn rlp_append(&self, s: &mut RlpStream) {
        self.0.rlp_append(s);
    }
}

impl Decodable for EventId {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Self(H256::decode(rlp)?))
    }
}

/// Append `items` to `s` as a nested RLP list.
pub fn append_rlp_list<T: Encodable>(s: &mut RlpStream, items: &[T]) {
    s.begin_list(items.len());
    for item in items {
        s.append(item);
    }
}

/// Read a nested list of `T` at position `index` of `rlp`.
pub fn rlp_list_at<T: Decodable>(rlp: &Rlp, index: usize) -> Result<Vec<T>, DecoderError> {
    let list = rlp.at(index)?;
    if !list.is_list() {
        return Err(DecoderError::RlpExpectedToBeList);
    }
    list.iter().map(|item| T::decode(&item)).collect()
}

/// Read a fixed-size byte string at position `index` of `rlp`.
pub fn rlp_fixed_bytes_at<const N: usize>(
    rlp: &Rlp,
    index: usize,
) -> Result<[u8; N], DecoderError> {
    let item = rlp.at(index)?;
    let data = item.data()?;
    if data.len() != N {
        return Err(DecoderError::RlpInvalidLength);
    }
    let mut out = [0u8; N];
    out.copy_from_slice(data);
    Ok(out)
}

/// Ensure `rlp` is a list with exactly `expected` items.
pub fn expect_list_len(rlp: &Rlp, expected: usize) -> Result<(), DecoderError> {
    if !rlp.is_list() {
        return Err(DecoderError::RlpExpectedToBeList);
    }
    if rlp.item_count()? != expected {
        return Err(DecoderError::RlpIncorrectListLen);
    }
    Ok(())
}
