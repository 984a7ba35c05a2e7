//! Error types for the RANDAO reveal scheme.

use shared_crypto::CryptoError;
use thiserror::Error;

/// RANDAO errors.
#[derive(Debug, Error)]
pub enum RandaoError {
    /// The proposer could not sign the reveal
    #[error("Failed to sign RANDAO reveal: {0}")]
    Signing(#[source] CryptoError),

    /// The reveal is not a valid signature of the expected message
    #[error("Invalid RANDAO reveal: {0}")]
    InvalidReveal(#[source] CryptoError),
}

/// Result alias for RANDAO operations.
pub type Result<T> = std::result::Result<T, RandaoError>;
