//! Inputs accepted by the scrambler.

use shared_types::{Address, Hash, Transaction, U256};

/// A transaction as seen by the scrambler.
pub trait ScramblerEntry {
    /// Unique transaction hash.
    fn hash(&self) -> Hash;
    /// Recovered sender.
    fn sender(&self) -> Address;
    /// Sender nonce.
    fn nonce(&self) -> u64;
    /// Ordering price.
    fn gas_price(&self) -> U256;
    /// EIP-7702 authorizations as `(authority, nonce)` pairs; authorities that
    /// could not be recovered are omitted.
    fn authorizations(&self) -> Vec<(Address, u64)>;
}

/// A transaction with its recovered sender and authorities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderTx {
    /// The transaction.
    pub tx: Transaction,
    /// Sender.
    pub sender: Address,
    /// Recovered authorities with the nonce each authorization consumes.
    pub authorities: Vec<(Address, u64)>,
    hash: Hash,
}

impl SenderTx {
    /// Wrap `tx` with its sender and recovered authorities.
    pub fn new(tx: Transaction, sender: Address, authorities: Vec<(Address, u64)>) -> Self {
        let hash = tx.hash();
        Self {
            tx,
            sender,
            authorities,
            hash,
        }
    }
}

impl ScramblerEntry for SenderTx {
    fn hash(&self) -> Hash {
        self.hash
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    fn gas_price(&self) -> U256 {
        self.tx.gas_price()
    }

    fn authorizations(&self) -> Vec<(Address, u64)> {
        self.authorities.clone()
    }
}
