//! # Error Types
//!
//! Decoding and validation errors of the shared data model.

use thiserror::Error;

/// Errors raised while decoding or constructing shared types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Input buffer was empty.
    #[error("Empty input")]
    Empty,

    /// RLP structure did not match the expected layout.
    #[error("RLP decoding failed: {0}")]
    Rlp(String),

    /// Unknown EIP-2718 envelope type.
    #[error("Unknown transaction type: {0:#04x}")]
    UnknownTxType(u8),

    /// Unknown event version.
    #[error("Unsupported event version: {0}")]
    UnsupportedEventVersion(u8),

    /// Unknown rules encoding version.
    #[error("Unsupported rules version: {0}")]
    UnsupportedRulesVersion(u8),

    /// Rules JSON could not be parsed or merged.
    #[error("Invalid rules JSON: {0}")]
    RulesJson(String),
}

impl From<rlp::DecoderError> for TypesError {
    fn from(err: rlp::DecoderError) -> Self {
        TypesError::Rlp(err.to_string())
    }
}

/// Aggregated rule-change validation failure.
///
/// Every violated constraint is collected so operators see the full list in
/// a single log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid rules: {}", .issues.join("; "))]
pub struct RulesValidationError {
    /// Individual constraint violations.
    pub issues: Vec<String>,
}

impl RulesValidationError {
    /// Number of violated constraints.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// True if nothing was violated.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}
