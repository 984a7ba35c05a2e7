//! # Shared Crypto
//!
//! Keys and signatures of validators and accounts.
//!
//! | Module | Primitive | Used for |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 | Event signatures, RANDAO reveals, validator identity |
//! | `tx_signer` | secp256k1 + Keccak | Transaction signing, sender recovery and caching |
//! | `keystore` | JSON key files | Encrypted validator keys, unlocked-key cache |
//! | `sealing` | BLAKE3 KDF + XChaCha20-Poly1305 | Password sealing of key files |
//!
//! Signatures are RFC 6979 deterministic and low-S normalized, so a reveal
//! or event signature is reproducible from the key and digest alone.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod keystore;
pub mod sealing;
pub mod tx_signer;

pub use ecdsa::{
    recover_address, RecoverableSignature, Secp256k1KeyPair, ValidatorPubKey,
    VALIDATOR_KEY_TYPE_SECP256K1,
};
pub use errors::CryptoError;
pub use keystore::{write_atomic, FileKeystore, KeystoreSigner, SyncedKeystore, ValidatorSigner};
pub use sealing::{Sealed, SealingKey};
pub use tx_signer::{recover_authority, sign_authorization, SenderCache, TxSigner};
