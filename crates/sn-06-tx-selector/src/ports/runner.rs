//! # Runner Port
//!
//! The selector tries each candidate against a scratch copy of the state, so
//! only transactions that would actually execute make it into a proposal.

use shared_types::{Address, Gas, Transaction};

/// Result of trying one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Executed; the scratch state now includes it.
    Included {
        /// Gas consumed.
        gas_used: Gas,
    },
    /// Nonce below the account nonce; later transactions of the sender may
    /// still fit.
    NonceTooLow,
    /// Nonce above the account nonce; nothing else from the sender fits.
    NonceGap,
    /// Any other failure (balance, intrinsic gas, authorization).
    Rejected,
}

/// Scratch execution environment.
pub trait TxRunner {
    /// Try `tx` sent by `sender`.
    fn run(&mut self, tx: &Transaction, sender: Address) -> RunOutcome;

    /// Current nonce of `address` in the scratch state.
    fn nonce(&self, address: &Address) -> u64;
}
