//! # ECDSA Signatures (secp256k1)
//!
//! Validator and account keys over the secp256k1 curve.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2)
//! - Signatures are produced and verified over 32-byte prehashes
//!
//! ## Validator Key Format
//!
//! ```text
//! [ 0xc0 ][ 0x04 ‖ x ‖ y ]     66 bytes
//!   type   uncompressed SEC1
//! ```

use crate::CryptoError;
use k256::ecdsa::{
    signature::hazmat::PrehashVerifier, RecoveryId, Signature, SigningKey, VerifyingKey,
};
use shared_types::{keccak256, Address, Hash};
use std::fmt;

/// Type byte of secp256k1 validator keys.
pub const VALIDATOR_KEY_TYPE_SECP256K1: u8 = 0xc0;

/// Length of an uncompressed SEC1 point.
pub const UNCOMPRESSED_KEY_LEN: usize = 65;

/// Public key of a validator: type byte plus uncompressed point.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorPubKey {
    raw: Vec<u8>,
}

impl ValidatorPubKey {
    /// Parse the 66-byte encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 1 + UNCOMPRESSED_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: 1 + UNCOMPRESSED_KEY_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != VALIDATOR_KEY_TYPE_SECP256K1 {
            return Err(CryptoError::InvalidPublicKey);
        }
        VerifyingKey::from_sec1_bytes(&bytes[1..]).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self {
            raw: bytes.to_vec(),
        })
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut raw = Vec::with_capacity(1 + UNCOMPRESSED_KEY_LEN);
        raw.push(VALIDATOR_KEY_TYPE_SECP256K1);
        raw.extend_from_slice(point.as_bytes());
        Self { raw }
    }

    /// Full encoding including the type byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Lowercase hex of the full encoding, used as key file name.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.raw)
    }

    /// Parse from hex with an optional `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    /// Verify a 64-byte R‖S signature over a 32-byte digest.
    pub fn verify(&self, digest: &Hash, signature: &[u8; 64]) -> Result<(), CryptoError> {
        let key = VerifyingKey::from_sec1_bytes(&self.raw[1..])
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        key.verify_prehash(digest.as_bytes(), &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Account address controlled by the same key.
    pub fn address(&self) -> Address {
        address_from_uncompressed(&self.raw[1..])
    }
}

impl fmt::Debug for ValidatorPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorPubKey(0x{}..)", &self.to_hex()[..12])
    }
}

impl fmt::Display for ValidatorPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Recoverable ECDSA signature in Ethereum layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    /// R‖S.
    pub rs: [u8; 64],
    /// Recovery id, 0 or 1.
    pub recovery_id: u8,
}

/// secp256k1 keypair.
pub struct Secp256k1KeyPair {
    // Wiped on drop by `SigningKey` itself.
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Validator public key.
    pub fn validator_pubkey(&self) -> ValidatorPubKey {
        ValidatorPubKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Account address of the key.
    pub fn address(&self) -> Address {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        address_from_uncompressed(point.as_bytes())
    }

    /// Sign a 32-byte digest, returning R‖S.
    pub fn sign_hash(&self, digest: &Hash) -> Result<[u8; 64], CryptoError> {
        Ok(self.sign_recoverable(digest)?.rs)
    }

    /// Sign a 32-byte digest with a recovery id.
    pub fn sign_recoverable(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|_| CryptoError::InvalidSignature)?;
        let rs: [u8; 64] = sig.to_bytes().into();
        Ok(RecoverableSignature {
            rs,
            recovery_id: recid.to_byte(),
        })
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

/// Recover the signer address of a digest.
pub fn recover_address(
    digest: &Hash,
    rs: &[u8; 64],
    recovery_id: u8,
) -> Result<Address, CryptoError> {
    let recid = RecoveryId::from_byte(recovery_id).ok_or(CryptoError::InvalidSignature)?;
    let sig = Signature::from_slice(rs).map_err(|_| CryptoError::InvalidSignature)?;
    // EIP-2: reject high-S signatures.
    if sig.normalize_s().is_some() {
        return Err(CryptoError::InvalidSignature);
    }
    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recid)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    let point = key.to_encoded_point(false);
    Ok(address_from_uncompressed(point.as_bytes()))
}

/// Address of an uncompressed SEC1 point (`0x04 ‖ x ‖ y`).
fn address_from_uncompressed(point: &[u8]) -> Address {
    let hash = keccak256(&point[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}
