//! # Blocks, Receipts and Logs
//!
//! ## Hash Preimage
//!
//! ```text
//! rlp([number, epoch, parent_hash, time, prev_randao, state_root,
//!      transactions_root, receipts_root, gas_limit, gas_used, base_fee,
//!      duration])
//! ```
//!
//! Roots are Keccak-256 commitments over the ordered lists.

use crate::hashing::keccak256;
use crate::primitives::{Address, BlockNumber, Epoch, EventId, Gas, Hash, UnixNanos, ValidatorId, U256};
use crate::transaction::Transaction;
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

/// Maximum encoded block size once Brio is active.
pub const MAX_BLOCK_SIZE: u64 = 8 * 1024 * 1024;

/// Maximum total transaction size of a single proposal.
pub const MAX_PROPOSAL_TX_SIZE: u64 = 8 * 1024 * 1024;

/// Successful receipt status.
pub const RECEIPT_STATUS_SUCCESSFUL: u8 = 1;

/// Failed receipt status.
pub const RECEIPT_STATUS_FAILED: u8 = 0;

/// Emitted EVM log.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Vec<u8>,
    /// Block height, stamped after assembly.
    pub block_number: BlockNumber,
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Transaction position in block.
    pub tx_index: u32,
    /// Block hash, stamped after assembly.
    pub block_hash: Hash,
    /// Log position in block.
    pub index: u32,
}

/// Transaction execution receipt.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Receipt {
    /// 1 on success, 0 on revert.
    pub status: u8,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: Gas,
    /// Gas used by this transaction.
    pub gas_used: Gas,
    /// Price paid per gas.
    pub effective_gas_price: U256,
    /// Logs.
    pub logs: Vec<Log>,
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Created contract, if any.
    pub contract_address: Option<Address>,
    /// Block hash, stamped after assembly.
    pub block_hash: Hash,
    /// Block height.
    pub block_number: BlockNumber,
    /// Position in block.
    pub transaction_index: u32,
}

impl Receipt {
    /// True on success.
    pub fn succeeded(&self) -> bool {
        self.status == RECEIPT_STATUS_SUCCESSFUL
    }
}

/// A finalized block.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    /// Height.
    pub number: BlockNumber,
    /// Epoch the block belongs to.
    pub epoch: Epoch,
    /// Parent block hash.
    pub parent_hash: Hash,
    /// Block time.
    pub time: UnixNanos,
    /// Time since parent block.
    pub duration: UnixNanos,
    /// Gas limit.
    pub gas_limit: Gas,
    /// Gas used.
    pub gas_used: Gas,
    /// Base fee.
    pub base_fee: U256,
    /// PREVRANDAO exposed to the EVM.
    pub prev_randao: Hash,
    /// State root after execution.
    pub state_root: Hash,
    /// Executed transactions, internal ones included.
    pub transactions: Vec<Transaction>,
    /// One receipt per transaction.
    pub receipts: Vec<Receipt>,
    /// Commitment over the header.
    pub hash: Hash,
}

impl Block {
    /// Commitment over the ordered transaction hashes.
    pub fn transactions_root(&self) -> Hash {
        let mut s = RlpStream::new_list(self.transactions.len());
        for tx in &self.transactions {
            s.append(&tx.hash());
        }
        keccak256(&s.out())
    }

    /// Commitment over the consensus fields of each receipt.
    pub fn receipts_root(&self) -> Hash {
        let mut s = RlpStream::new_list(self.receipts.len());
        for r in &self.receipts {
            s.begin_list(3);
            s.append(&r.status);
            s.append(&r.cumulative_gas_used);
            s.begin_list(r.logs.len());
            for log in &r.logs {
                s.begin_list(3);
                s.append(&log.address);
                s.begin_list(log.topics.len());
                for t in &log.topics {
                    s.append(t);
                }
                s.append(&log.data);
            }
        }
        keccak256(&s.out())
    }

    fn header_rlp(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(12);
        s.append(&self.number);
        s.append(&self.epoch);
        s.append(&self.parent_hash);
        s.append(&self.time);
        s.append(&self.prev_randao);
        s.append(&self.state_root);
        s.append(&self.transactions_root());
        s.append(&self.receipts_root());
        s.append(&self.gas_limit);
        s.append(&self.gas_used);
        s.append(&self.base_fee);
        s.append(&self.duration);
        s.out().to_vec()
    }

    /// Hash over the canonical header.
    pub fn compute_hash(&self) -> Hash {
        keccak256(&self.header_rlp())
    }

    /// Encoded size: header plus transactions.
    pub fn size(&self) -> u64 {
        self.header_rlp().len() as u64 + self.transactions.iter().map(|tx| tx.size()).sum::<u64>()
    }
}

/// Assembles a [`Block`] and stamps the final hash into receipts and logs.
#[derive(Debug, Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    /// Start a new block at `number`.
    pub fn new(number: BlockNumber) -> Self {
        Self {
            block: Block {
                number,
                ..Default::default()
            },
        }
    }

    /// Set the epoch.
    pub fn with_epoch(mut self, epoch: Epoch) -> Self {
        self.block.epoch = epoch;
        self
    }

    /// Set the parent hash.
    pub fn with_parent_hash(mut self, parent_hash: Hash) -> Self {
        self.block.parent_hash = parent_hash;
        self
    }

    /// Set time and duration since the parent.
    pub fn with_time(mut self, time: UnixNanos, parent_time: UnixNanos) -> Self {
        self.block.time = time;
        self.block.duration = time.saturating_sub(parent_time);
        self
    }

    /// Set the gas limit.
    pub fn with_gas_limit(mut self, gas_limit: Gas) -> Self {
        self.block.gas_limit = gas_limit;
        self
    }

    /// Set the base fee.
    pub fn with_base_fee(mut self, base_fee: U256) -> Self {
        self.block.base_fee = base_fee;
        self
    }

    /// Set the PREVRANDAO.
    pub fn with_prev_randao(mut self, prev_randao: Hash) -> Self {
        self.block.prev_randao = prev_randao;
        self
    }

    /// Set the post-execution state root.
    pub fn with_state_root(mut self, state_root: Hash) -> Self {
        self.block.state_root = state_root;
        self
    }

    /// Append an executed transaction with its receipt.
    pub fn add_transaction(&mut self, tx: Transaction, receipt: Receipt) {
        self.block.gas_used += receipt.gas_used;
        self.block.transactions.push(tx);
        self.block.receipts.push(receipt);
    }

    /// Number of transactions added so far.
    pub fn len(&self) -> usize {
        self.block.transactions.len()
    }

    /// True if no transaction was added.
    pub fn is_empty(&self) -> bool {
        self.block.transactions.is_empty()
    }

    /// Compute the hash and stamp it into every receipt and log.
    pub fn build(mut self) -> Block {
        let mut cumulative = 0;
        let mut log_index = 0u32;
        for (i, (tx, receipt)) in self
            .block
            .transactions
            .iter()
            .zip(self.block.receipts.iter_mut())
            .enumerate()
        {
            cumulative += receipt.gas_used;
            receipt.cumulative_gas_used = cumulative;
            receipt.tx_hash = tx.hash();
            receipt.transaction_index = i as u32;
            receipt.block_number = self.block.number;
            for log in receipt.logs.iter_mut() {
                log.tx_hash = receipt.tx_hash;
                log.tx_index = i as u32;
                log.block_number = self.block.number;
                log.index = log_index;
                log_index += 1;
            }
        }

        let hash = self.block.compute_hash();
        self.block.hash = hash;
        for receipt in self.block.receipts.iter_mut() {
            receipt.block_hash = hash;
            for log in receipt.logs.iter_mut() {
                log.block_hash = hash;
            }
        }
        self.block
    }
}

/// Location of a transaction in the chain and the DAG.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxPosition {
    /// Block height.
    pub block: BlockNumber,
    /// Index in the block.
    pub block_offset: u32,
    /// Event that carried the transaction.
    pub event: EventId,
    /// Index in that event (or proposal).
    pub event_offset: u32,
    /// Creator of that event.
    pub event_creator: ValidatorId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            gas: 21_000,
            to: Some(Address::repeat_byte(1)),
            ..Default::default()
        }
    }

    fn receipt(gas_used: Gas, logs: usize) -> Receipt {
        Receipt {
            status: RECEIPT_STATUS_SUCCESSFUL,
            gas_used,
            logs: vec![Log::default(); logs],
            ..Default::default()
        }
    }

    #[test]
    fn test_builder_stamps_hash_into_receipts_and_logs() {
        let mut builder = BlockBuilder::new(5)
            .with_parent_hash(Hash::repeat_byte(4))
            .with_time(2_000, 1_500);
        builder.add_transaction(tx(0), receipt(21_000, 1));
        builder.add_transaction(tx(1), receipt(30_000, 2));
        let block = builder.build();

        assert_eq!(block.gas_used, 51_000);
        assert_eq!(block.duration, 500);
        assert_eq!(block.hash, block.compute_hash());
        assert_eq!(block.receipts[1].cumulative_gas_used, 51_000);
        assert!(block.receipts.iter().all(|r| r.block_hash == block.hash));
        let log_indices: Vec<u32> = block
            .receipts
            .iter()
            .flat_map(|r| r.logs.iter().map(|l| l.index))
            .collect();
        assert_eq!(log_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_hash_commits_to_transactions() {
        let mut a = BlockBuilder::new(1);
        a.add_transaction(tx(0), receipt(21_000, 0));
        let mut b = BlockBuilder::new(1);
        b.add_transaction(tx(1), receipt(21_000, 0));
        assert_ne!(a.build().hash, b.build().hash);
    }

    #[test]
    fn test_size_grows_with_transactions() {
        let empty = BlockBuilder::new(1).build();
        let mut full = BlockBuilder::new(1);
        full.add_transaction(tx(0), receipt(21_000, 0));
        assert!(full.build().size() > empty.size());
    }
}
