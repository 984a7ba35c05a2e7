//! # Heavy Check
//!
//! The CPU-bound part of validation: the creator's signature, transaction
//! sender recovery (warming the sender cache for block assembly) and the
//! payload hash.

use crate::error::{CheckError, Result};
use shared_crypto::{SenderCache, ValidatorPubKey};
use shared_types::{EpochState, EventPayload};

/// Validate signature, senders and payload hash of `event`.
pub fn validate(event: &EventPayload, epoch: &EpochState, senders: &SenderCache) -> Result<()> {
    let creator = event.creator();
    let raw = epoch
        .pubkey(creator)
        .ok_or_else(|| CheckError::AuthFailure(format!("no key for validator {creator}")))?;
    let pubkey = ValidatorPubKey::from_bytes(raw)
        .map_err(|e| CheckError::AuthFailure(format!("validator {creator}: {e}")))?;
    pubkey
        .verify(&event.header().hash_to_sign(), &event.signature().0)
        .map_err(|_| CheckError::InvalidSignature)?;

    let proposal_txs = event
        .payload()
        .and_then(|p| p.proposal.as_ref())
        .map(|p| p.transactions.as_slice())
        .unwrap_or_default();
    for tx in event.txs().iter().chain(proposal_txs) {
        senders
            .sender(tx)
            .map_err(|e| CheckError::AuthFailure(format!("tx {:?}: {e}", tx.hash())))?;
    }

    if event.compute_payload_hash() != event.header().payload_hash {
        return Err(CheckError::InvalidPayloadHash);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shared_crypto::{Secp256k1KeyPair, TxSigner};
    use shared_types::{
        EventHeader, EventSignature, MutableEventPayload, Rules, Transaction, ValidatorProfile,
        U256,
    };

    pub(crate) fn signed_event(key: &Secp256k1KeyPair, mut m: MutableEventPayload) -> EventPayload {
        m.header.payload_hash = m.compute_payload_hash();
        let sig = key.sign_hash(&m.header.hash_to_sign()).unwrap();
        m.build(EventSignature(sig))
    }

    pub(crate) fn epoch_with_key(key: &Secp256k1KeyPair) -> EpochState {
        let profiles = [(
            1,
            ValidatorProfile {
                weight: U256::from(1u64),
                pubkey: key.validator_pubkey().as_bytes().to_vec(),
            },
        )]
        .into_iter()
        .collect();
        EpochState::genesis(1, 1, profiles, Rules::fake_net())
    }

    fn base() -> MutableEventPayload {
        MutableEventPayload {
            header: EventHeader {
                version: 2,
                epoch: 1,
                seq: 1,
                frame: 1,
                lamport: 1,
                creator: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_signature_and_senders() {
        let key = Secp256k1KeyPair::generate();
        let signer = TxSigner::new(0xfa3);
        let tx = signer
            .sign(
                Transaction {
                    gas: 21_000,
                    to: Some(Default::default()),
                    ..Default::default()
                },
                &key,
            )
            .unwrap();
        let mut m = base();
        m.txs = vec![tx];
        let e = signed_event(&key, m);
        let cache = SenderCache::new(signer, 16);
        assert_eq!(validate(&e, &epoch_with_key(&key), &cache), Ok(()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let key = Secp256k1KeyPair::generate();
        let other = Secp256k1KeyPair::generate();
        let e = signed_event(&other, base());
        let cache = SenderCache::new(TxSigner::new(1), 16);
        assert_eq!(
            validate(&e, &epoch_with_key(&key), &cache),
            Err(CheckError::InvalidSignature)
        );
    }

    #[test]
    fn test_payload_hash_mismatch() {
        let key = Secp256k1KeyPair::generate();
        let mut m = base();
        m.header.payload_hash = shared_types::Hash::repeat_byte(1);
        let sig = key.sign_hash(&m.header.hash_to_sign()).unwrap();
        let e = m.build(EventSignature(sig));
        let cache = SenderCache::new(TxSigner::new(1), 16);
        assert_eq!(
            validate(&e, &epoch_with_key(&key), &cache),
            Err(CheckError::InvalidPayloadHash)
        );
    }

    #[test]
    fn test_unsigned_tx_is_auth_failure() {
        let key = Secp256k1KeyPair::generate();
        let mut m = base();
        m.txs = vec![Transaction::default()];
        let e = signed_event(&key, m);
        let cache = SenderCache::new(TxSigner::new(1), 16);
        assert!(matches!(
            validate(&e, &epoch_with_key(&key), &cache),
            Err(CheckError::AuthFailure(_))
        ));
    }
}
