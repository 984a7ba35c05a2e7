//! # Reveal Construction and Verification
//!
//! ```text
//! message     = sha256("Sonic-Randao" ‖ previous_randao)
//! reveal      = sign(message)                 64-byte R‖S
//! next_randao = sha256(reveal)
//! ```
//!
//! When no reveal is available, or it fails verification, every node falls
//! back to the legacy value derived from the confirmed event ids.

use crate::error::{RandaoError, Result};
use shared_crypto::{ValidatorPubKey, ValidatorSigner};
use shared_types::{sha256, sha256_concat, EventId, Hash, RandaoReveal};

/// Domain separator of the signed message.
pub const RANDAO_DOMAIN: &[u8] = b"Sonic-Randao";

/// Message the proposer signs for `previous_randao`.
pub fn reveal_message(previous_randao: &Hash) -> Hash {
    sha256_concat(&[RANDAO_DOMAIN, previous_randao.as_bytes()])
}

/// Produce the reveal for the block following `previous_randao`.
pub fn new_reveal(previous_randao: &Hash, signer: &dyn ValidatorSigner) -> Result<RandaoReveal> {
    let sig = signer
        .sign_hash(&reveal_message(previous_randao))
        .map_err(RandaoError::Signing)?;
    Ok(RandaoReveal(sig))
}

/// Verify `reveal` against `pubkey` and return the next randao.
pub fn verify_reveal(
    reveal: &RandaoReveal,
    previous_randao: &Hash,
    pubkey: &ValidatorPubKey,
) -> Result<Hash> {
    pubkey
        .verify(&reveal_message(previous_randao), reveal.as_bytes())
        .map_err(RandaoError::InvalidReveal)?;
    Ok(sha256(reveal.as_bytes()))
}

/// Legacy PREVRANDAO: `sha256` of the XOR of all event ids with their first
/// eight bytes (epoch and lamport) masked out.
pub fn legacy_prev_randao(events: &[EventId]) -> Hash {
    let mut acc = [0u8; 32];
    for id in events {
        for (i, b) in id.as_bytes().iter().enumerate().skip(8) {
            acc[i] ^= b;
        }
    }
    sha256(&acc)
}

/// PREVRANDAO of a block: the verified reveal if present, else the legacy
/// value over `events`.
pub fn prev_randao(
    reveal: Option<(&RandaoReveal, &ValidatorPubKey)>,
    previous_randao: &Hash,
    events: &[EventId],
) -> Hash {
    if let Some((reveal, pubkey)) = reveal {
        match verify_reveal(reveal, previous_randao, pubkey) {
            Ok(next) => return next,
            Err(e) => {
                tracing::warn!(
                    proposer = %pubkey,
                    error = %e,
                    "[sn-01] 🎲 RANDAO reveal rejected, using event-derived value"
                );
            }
        }
    }
    legacy_prev_randao(events)
}
