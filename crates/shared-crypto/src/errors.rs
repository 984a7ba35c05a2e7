//! Errors raised by signing, recovery and the keystore.

use thiserror::Error;

/// Failure of a key, signature or keystore operation.
#[derive(Debug, Error)]
pub enum CryptoError {
    // --- signatures ---
    /// Bytes do not form a valid secp256k1 signature.
    #[error("malformed signature")]
    InvalidSignature,

    /// Signature is well-formed but does not match the key and digest.
    #[error("signature does not verify")]
    SignatureVerificationFailed,

    /// No public key could be recovered from the signature.
    #[error("cannot recover signer")]
    RecoveryFailed,

    /// Transaction was signed for a different chain.
    #[error("chain id mismatch: signer {expected}, tx {actual}")]
    InvalidChainId {
        /// Chain id of the signer.
        expected: u64,
        /// Chain id carried by the transaction.
        actual: u64,
    },

    // --- key material ---
    /// Public key bytes are not a curve point.
    #[error("malformed public key")]
    InvalidPublicKey,

    /// Secret scalar is zero or out of range.
    #[error("malformed secret key")]
    InvalidPrivateKey,

    /// Key material has the wrong size.
    #[error("key is {actual} bytes, want {expected}")]
    InvalidKeyLength {
        /// Required size.
        expected: usize,
        /// Size received.
        actual: usize,
    },

    // --- keystore ---
    /// No key file for the requested public key.
    #[error("no key for {0}")]
    KeyNotFound(String),

    /// Key has not been unlocked with its password.
    #[error("key {0} is locked")]
    KeyLocked(String),

    /// Refusing to overwrite an existing key file.
    #[error("key {0} already exists")]
    KeyExists(String),

    /// Key file cannot be parsed.
    #[error("bad keystore file: {0}")]
    InvalidKeystore(String),

    /// Sealing the secret failed.
    #[error("seal: {0}")]
    EncryptionFailed(String),

    /// Wrong password or tampered key file.
    #[error("unseal: {0}")]
    DecryptionFailed(String),

    /// Filesystem failure.
    #[error("keystore io: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// False only for environment failures; every other variant is caused by
    /// the input and may succeed with a different one.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CryptoError::Io(_))
    }
}
