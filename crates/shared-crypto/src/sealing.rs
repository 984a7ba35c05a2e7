//! # Keystore Sealing
//!
//! ```text
//!   password ‖ salt ──BLAKE3 derive_key(context)──► sealing key
//!   secret ──XChaCha20-Poly1305(sealing key, random 24-byte nonce)──► sealed
//! ```
//!
//! The 192-bit nonce is drawn fresh for every seal, so one sealing key may
//! seal many secrets.

use crate::CryptoError;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// BLAKE3 context binding derived keys to validator keystores.
pub const KEYSTORE_KDF_CONTEXT: &str = "sonic validator keystore 2024-01-01 key encryption";

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Symmetric key derived from a password; wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SealingKey([u8; 32]);

impl SealingKey {
    /// Derive the key for `password` under `salt`.
    pub fn derive(password: &str, salt: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KEYSTORE_KDF_CONTEXT);
        hasher.update(password.as_bytes());
        hasher.update(salt);
        Self(*hasher.finalize().as_bytes())
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new((&self.0).into())
    }

    /// Seal `secret` under a fresh nonce.
    pub fn seal(&self, secret: &[u8]) -> Result<Sealed, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), secret)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Sealed { ciphertext, nonce })
    }

    /// Recover the secret from `sealed`. Fails on a wrong key or tampered
    /// ciphertext.
    pub fn open(&self, sealed: &Sealed) -> Result<Vec<u8>, CryptoError> {
        self.cipher()
            .decrypt(XNonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

/// Fresh random salt.
pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Ciphertext with its authentication tag and the nonce it was sealed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    /// Ciphertext followed by the Poly1305 tag.
    pub ciphertext: Vec<u8>,
    /// Nonce.
    pub nonce: [u8; NONCE_LEN],
}
