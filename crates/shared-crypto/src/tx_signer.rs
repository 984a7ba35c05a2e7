//! # Transaction Signer
//!
//! Chain-id aware signing and sender recovery for every transaction type,
//! plus EIP-7702 authority recovery. [`SenderCache`] memoizes recovered
//! senders by transaction hash so checkers and the block processor never
//! recover the same signature twice.

use crate::ecdsa::{recover_address, Secp256k1KeyPair};
use crate::CryptoError;
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::transaction::legacy_chain_id;
use shared_types::{Address, Authorization, Hash, Transaction, TxSignature, TxType, U256};
use std::num::NonZeroUsize;

/// Default capacity of [`SenderCache`].
pub const DEFAULT_SENDER_CACHE_SIZE: usize = 16_384;

/// Signs and recovers transactions of one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxSigner {
    chain_id: u64,
}

impl TxSigner {
    /// Signer for `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    /// Chain id of the signer.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Stamp the chain id and attach a signature made with `key`.
    pub fn sign(
        &self,
        mut tx: Transaction,
        key: &Secp256k1KeyPair,
    ) -> Result<Transaction, CryptoError> {
        tx.chain_id = self.chain_id;
        let sig = key.sign_recoverable(&tx.signing_hash())?;
        let v = match tx.tx_type {
            TxType::Legacy => sig.recovery_id as u64 + 35 + 2 * self.chain_id,
            _ => sig.recovery_id as u64,
        };
        tx.signature = TxSignature {
            v,
            r: U256::from_big_endian(&sig.rs[..32]),
            s: U256::from_big_endian(&sig.rs[32..]),
        };
        Ok(tx)
    }

    /// Recover the sender of a signed transaction.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, CryptoError> {
        if tx.signature.is_empty() {
            return Err(CryptoError::InvalidSignature);
        }
        let recovery_id = match tx.tx_type {
            TxType::Legacy => match legacy_chain_id(tx.signature.v) {
                Some(id) => {
                    if id != self.chain_id {
                        return Err(CryptoError::InvalidChainId {
                            expected: self.chain_id,
                            actual: id,
                        });
                    }
                    tx.signature.v - 35 - 2 * id
                }
                None => tx.signature.v.checked_sub(27).ok_or(CryptoError::InvalidSignature)?,
            },
            _ => {
                if tx.chain_id != self.chain_id {
                    return Err(CryptoError::InvalidChainId {
                        expected: self.chain_id,
                        actual: tx.chain_id,
                    });
                }
                tx.signature.v
            }
        };
        let recovery_id = u8::try_from(recovery_id).map_err(|_| CryptoError::InvalidSignature)?;
        let rs = join_rs(&tx.signature.r, &tx.signature.s);
        recover_address(&tx.signing_hash(), &rs, recovery_id)
    }
}

/// Sign an EIP-7702 authorization with `key`.
pub fn sign_authorization(
    mut auth: Authorization,
    key: &Secp256k1KeyPair,
) -> Result<Authorization, CryptoError> {
    let sig = key.sign_recoverable(&auth.signing_hash())?;
    auth.y_parity = sig.recovery_id;
    auth.r = U256::from_big_endian(&sig.rs[..32]);
    auth.s = U256::from_big_endian(&sig.rs[32..]);
    Ok(auth)
}

/// Recover the authority that signed `auth`.
pub fn recover_authority(auth: &Authorization) -> Result<Address, CryptoError> {
    let rs = join_rs(&auth.r, &auth.s);
    recover_address(&auth.signing_hash(), &rs, auth.y_parity)
}

fn join_rs(r: &U256, s: &U256) -> [u8; 64] {
    let mut rs = [0u8; 64];
    r.to_big_endian(&mut rs[..32]);
    s.to_big_endian(&mut rs[32..]);
    rs
}

/// LRU of recovered senders keyed by transaction hash.
pub struct SenderCache {
    signer: TxSigner,
    cache: Mutex<LruCache<Hash, Address>>,
}

impl SenderCache {
    /// Cache for `signer` holding at most `capacity` senders.
    pub fn new(signer: TxSigner, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            signer,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The wrapped signer.
    pub fn signer(&self) -> TxSigner {
        self.signer
    }

    /// Sender of `tx`, recovering and caching on a miss.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, CryptoError> {
        let hash = tx.hash();
        if let Some(addr) = self.cache.lock().get(&hash) {
            return Ok(*addr);
        }
        let addr = self.signer.sender(tx)?;
        self.cache.lock().put(hash, addr);
        Ok(addr)
    }

    /// Number of cached senders.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(tx_type: TxType, nonce: u64) -> Transaction {
        Transaction {
            tx_type,
            nonce,
            gas: 21_000,
            gas_fee_cap: U256::from(10u64),
            gas_tip_cap: U256::from(1u64),
            to: Some(Address::repeat_byte(0x11)),
            value: U256::from(5u64),
            ..Default::default()
        }
    }

    #[test]
    fn test_sign_and_recover_all_types() {
        let key = Secp256k1KeyPair::generate();
        let signer = TxSigner::new(0xfa3);
        for ty in [TxType::Legacy, TxType::AccessList, TxType::DynamicFee, TxType::SetCode] {
            let signed = signer.sign(tx(ty, 1), &key).unwrap();
            assert_eq!(signer.sender(&signed).unwrap(), key.address());
        }
    }

    #[test]
    fn test_legacy_v_carries_chain_id() {
        let key = Secp256k1KeyPair::generate();
        let signed = TxSigner::new(250).sign(tx(TxType::Legacy, 0), &key).unwrap();
        assert_eq!(legacy_chain_id(signed.signature.v), Some(250));
    }

    #[test]
    fn test_wrong_chain_rejected() {
        let key = Secp256k1KeyPair::generate();
        let signed = TxSigner::new(1).sign(tx(TxType::DynamicFee, 0), &key).unwrap();
        assert!(matches!(
            TxSigner::new(2).sender(&signed),
            Err(CryptoError::InvalidChainId { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_unsigned_rejected() {
        assert!(TxSigner::new(1).sender(&tx(TxType::Legacy, 0)).is_err());
    }

    #[test]
    fn test_authorization_roundtrip() {
        let key = Secp256k1KeyPair::generate();
        let auth = Authorization {
            chain_id: U256::from(1u64),
            address: Address::repeat_byte(0x22),
            nonce: 4,
            ..Default::default()
        };
        let signed = sign_authorization(auth, &key).unwrap();
        assert_eq!(recover_authority(&signed).unwrap(), key.address());
    }

    #[test]
    fn test_sender_cache_hits() {
        let key = Secp256k1KeyPair::generate();
        let signer = TxSigner::new(7);
        let cache = SenderCache::new(signer, 2);
        let signed = signer.sign(tx(TxType::DynamicFee, 3), &key).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.sender(&signed).unwrap(), key.address());
        assert_eq!(cache.sender(&signed).unwrap(), key.address());
        assert_eq!(cache.len(), 1);
    }
}
