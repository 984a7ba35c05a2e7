//! # Transfer-Only EVM
//!
//! In-memory world state that understands value transfers and the driver
//! contract. Used by the fake net and by tests.
//!
//! - Nonces are checked and advanced; fees are burned.
//! - Calls to the driver from its owner emit the matching driver log.
//! - Contract creation is included but fails.
//! - The state root is Keccak-256 over the RLP of all accounts in address
//!   order.

use crate::domain::driver::{DriverCall, DRIVER_ADDRESS};
use crate::ports::{Evm, EvmBlockContext, EvmProcessor, SkipReason, StateReader, TxOutcome};
use parking_lot::RwLock;
use rlp::RlpStream;
use shared_types::{
    keccak256, Address, Gas, Hash, Log, Receipt, Transaction, RECEIPT_STATUS_FAILED,
    RECEIPT_STATUS_SUCCESSFUL, U256,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Account state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Account {
    /// Balance in wei.
    pub balance: U256,
    /// Next nonce.
    pub nonce: u64,
}

type Accounts = BTreeMap<Address, Account>;

/// In-memory transfer EVM.
#[derive(Debug, Clone)]
pub struct TransferEvm {
    accounts: Arc<RwLock<Accounts>>,
    driver_owner: Option<Address>,
}

impl TransferEvm {
    /// World state funded with `alloc`. Only `driver_owner` may call the
    /// driver contract.
    pub fn new<I>(alloc: I, driver_owner: Option<Address>) -> Self
    where
        I: IntoIterator<Item = (Address, U256)>,
    {
        let accounts = alloc
            .into_iter()
            .map(|(address, balance)| (address, Account { balance, nonce: 0 }))
            .collect();
        Self {
            accounts: Arc::new(RwLock::new(accounts)),
            driver_owner,
        }
    }

    /// Committed state of `address`.
    pub fn account(&self, address: &Address) -> Account {
        self.accounts.read().get(address).copied().unwrap_or_default()
    }
}

impl StateReader for TransferEvm {
    fn nonce(&self, address: &Address) -> u64 {
        self.account(address).nonce
    }

    fn balance(&self, address: &Address) -> U256 {
        self.account(address).balance
    }

    fn state_root(&self) -> Hash {
        state_root(&self.accounts.read())
    }
}

impl Evm for TransferEvm {
    fn begin(&self, ctx: EvmBlockContext) -> Box<dyn EvmProcessor> {
        Box::new(TransferBlock {
            accounts: Arc::clone(&self.accounts),
            dirty: Accounts::new(),
            driver_owner: self.driver_owner,
            ctx,
            gas_used: 0,
        })
    }
}

fn state_root(accounts: &Accounts) -> Hash {
    let mut s = RlpStream::new_list(accounts.len());
    for (address, account) in accounts {
        s.begin_list(3);
        s.append(address);
        s.append(&account.nonce);
        s.append(&account.balance);
    }
    keccak256(&s.out())
}

struct TransferBlock {
    accounts: Arc<RwLock<Accounts>>,
    dirty: Accounts,
    driver_owner: Option<Address>,
    ctx: EvmBlockContext,
    gas_used: Gas,
}

impl TransferBlock {
    fn load(&self, address: &Address) -> Account {
        if let Some(account) = self.dirty.get(address) {
            return *account;
        }
        self.accounts.read().get(address).copied().unwrap_or_default()
    }

    fn driver_call(&self, tx: &Transaction, sender: Address, internal: bool) -> Option<Vec<Log>> {
        let call = DriverCall::decode(&tx.data)?;
        let allowed = if internal {
            call.is_internal_only()
        } else {
            !call.is_internal_only() && self.driver_owner == Some(sender)
        };
        allowed.then(|| call.to_log().into_iter().collect())
    }

    fn receipt(
        &self,
        tx: &Transaction,
        ok: bool,
        gas_used: Gas,
        logs: Vec<Log>,
        price: U256,
    ) -> Receipt {
        Receipt {
            status: if ok {
                RECEIPT_STATUS_SUCCESSFUL
            } else {
                RECEIPT_STATUS_FAILED
            },
            gas_used,
            effective_gas_price: price,
            logs,
            tx_hash: tx.hash(),
            block_number: self.ctx.number,
            ..Default::default()
        }
    }

    fn execute_internal(&mut self, tx: &Transaction, sender: Address) -> TxOutcome {
        let gas_used = tx.intrinsic_gas().unwrap_or(0).min(tx.gas);
        let (ok, logs) = if tx.to == Some(DRIVER_ADDRESS) {
            match self.driver_call(tx, sender, true) {
                Some(logs) => (true, logs),
                None => (false, Vec::new()),
            }
        } else {
            (false, Vec::new())
        };
        self.gas_used += gas_used;
        TxOutcome::Executed(self.receipt(tx, ok, gas_used, logs, U256::zero()))
    }
}

impl EvmProcessor for TransferBlock {
    fn execute(&mut self, tx: &Transaction, sender: Address, internal: bool) -> TxOutcome {
        if internal {
            return self.execute_internal(tx, sender);
        }

        let mut from = self.load(&sender);
        if tx.nonce != from.nonce {
            return TxOutcome::Skipped(SkipReason::Nonce);
        }
        let Some(intrinsic) = tx.intrinsic_gas() else {
            return TxOutcome::Skipped(SkipReason::Gas);
        };
        if intrinsic > tx.gas || self.gas_used.saturating_add(tx.gas) > self.ctx.gas_limit {
            return TxOutcome::Skipped(SkipReason::Gas);
        }
        if tx.gas_fee_cap < self.ctx.base_fee {
            return TxOutcome::Skipped(SkipReason::FeeCap);
        }
        let price = tx.effective_gas_price(self.ctx.base_fee);
        let max_cost = price
            .checked_mul(U256::from(tx.gas))
            .and_then(|fee| fee.checked_add(tx.value));
        match max_cost {
            Some(cost) if cost <= from.balance => {}
            _ => return TxOutcome::Skipped(SkipReason::Balance),
        }

        from.nonce += 1;
        from.balance -= price * U256::from(intrinsic);

        let (ok, logs, recipient) = match tx.to {
            Some(to) if to == DRIVER_ADDRESS => match self.driver_call(tx, sender, false) {
                Some(logs) => (true, logs, None),
                None => (false, Vec::new(), None),
            },
            Some(to) => (true, Vec::new(), Some(to)),
            None => (false, Vec::new(), None),
        };

        if let Some(to) = recipient {
            from.balance -= tx.value;
            self.dirty.insert(sender, from);
            let mut dest = self.load(&to);
            dest.balance = dest.balance.saturating_add(tx.value);
            self.dirty.insert(to, dest);
        } else {
            self.dirty.insert(sender, from);
        }

        self.gas_used += intrinsic;
        TxOutcome::Executed(self.receipt(tx, ok, intrinsic, logs, price))
    }

    fn gas_used(&self) -> Gas {
        self.gas_used
    }

    fn commit(self: Box<Self>) -> Hash {
        let this = *self;
        let mut accounts = this.accounts.write();
        accounts.extend(this.dirty);
        state_root(&accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ChainConfig, Rules, TxType};

    fn ctx(gas_limit: Gas) -> EvmBlockContext {
        EvmBlockContext {
            number: 1,
            time: 1,
            prev_randao: Hash::zero(),
            base_fee: U256::from(10u64),
            gas_limit,
            chain: ChainConfig::default(),
            rules: Rules::fake_net(),
        }
    }

    fn transfer(nonce: u64, to: Address, value: u64) -> Transaction {
        Transaction {
            tx_type: TxType::DynamicFee,
            nonce,
            gas: 21_000,
            gas_fee_cap: U256::from(12u64),
            gas_tip_cap: U256::from(1u64),
            to: Some(to),
            value: U256::from(value),
            ..Default::default()
        }
    }

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn bob() -> Address {
        Address::repeat_byte(0xb0)
    }

    fn evm() -> TransferEvm {
        TransferEvm::new([(alice(), U256::from(1_000_000_000u64))], Some(alice()))
    }

    fn executed(outcome: TxOutcome) -> Receipt {
        match outcome {
            TxOutcome::Executed(r) => r,
            TxOutcome::Skipped(reason) => panic!("skipped: {reason:?}"),
        }
    }

    #[test]
    fn test_transfer_charges_fee_and_value() {
        let evm = evm();
        let mut block = evm.begin(ctx(1_000_000));
        let r = executed(block.execute(&transfer(0, bob(), 500), alice(), false));
        assert!(r.succeeded());
        assert_eq!(r.gas_used, 21_000);
        assert_eq!(r.effective_gas_price, U256::from(11u64));
        let root = block.commit();

        assert_eq!(evm.balance(&bob()), U256::from(500u64));
        assert_eq!(
            evm.balance(&alice()),
            U256::from(1_000_000_000u64 - 500 - 21_000 * 11)
        );
        assert_eq!(evm.nonce(&alice()), 1);
        assert_eq!(evm.state_root(), root);
    }

    #[test]
    fn test_uncommitted_block_leaves_state() {
        let evm = evm();
        let before = evm.state_root();
        let mut block = evm.begin(ctx(1_000_000));
        executed(block.execute(&transfer(0, bob(), 1), alice(), false));
        drop(block);
        assert_eq!(evm.state_root(), before);
    }

    #[test]
    fn test_skip_reasons() {
        let evm = evm();
        let mut block = evm.begin(ctx(30_000));
        assert!(matches!(
            block.execute(&transfer(1, bob(), 1), alice(), false),
            TxOutcome::Skipped(SkipReason::Nonce)
        ));
        let mut cheap = transfer(0, bob(), 1);
        cheap.gas_fee_cap = U256::from(5u64);
        assert!(matches!(
            block.execute(&cheap, alice(), false),
            TxOutcome::Skipped(SkipReason::FeeCap)
        ));
        assert!(matches!(
            block.execute(&transfer(0, bob(), 1), bob(), false),
            TxOutcome::Skipped(SkipReason::Balance)
        ));
        executed(block.execute(&transfer(0, bob(), 1), alice(), false));
        assert!(matches!(
            block.execute(&transfer(1, bob(), 1), alice(), false),
            TxOutcome::Skipped(SkipReason::Gas)
        ));
        assert_eq!(block.gas_used(), 21_000);
    }

    #[test]
    fn test_self_transfer_keeps_value() {
        let evm = evm();
        let mut block = evm.begin(ctx(1_000_000));
        executed(block.execute(&transfer(0, alice(), 1000), alice(), false));
        block.commit();
        assert_eq!(
            evm.balance(&alice()),
            U256::from(1_000_000_000u64 - 21_000 * 11)
        );
    }

    #[test]
    fn test_driver_call_emits_log_for_owner_only() {
        let evm = TransferEvm::new(
            [
                (alice(), U256::from(10_000_000_000u64)),
                (bob(), U256::from(10_000_000_000u64)),
            ],
            Some(alice()),
        );
        let call = DriverCall::AdvanceEpochs(1);
        let mut tx = transfer(0, DRIVER_ADDRESS, 0);
        tx.data = call.encode();
        tx.gas = 100_000;

        let mut block = evm.begin(ctx(1_000_000));
        let r = executed(block.execute(&tx, alice(), false));
        assert!(r.succeeded());
        assert_eq!(r.logs, vec![call.to_log().unwrap()]);

        let r = executed(block.execute(&tx, bob(), false));
        assert!(!r.succeeded());
        assert!(r.logs.is_empty());
        block.commit();
        assert_eq!(evm.nonce(&bob()), 1, "failed calls still consume the nonce");
    }

    #[test]
    fn test_internal_seal_call() {
        let evm = evm();
        let mut block = evm.begin(ctx(1_000_000));
        let tx = Transaction {
            to: Some(DRIVER_ADDRESS),
            data: DriverCall::SealEpoch(1).encode(),
            gas: 1_000_000,
            ..Default::default()
        };
        let r = executed(block.execute(&tx, Address::zero(), true));
        assert!(r.succeeded());
        assert!(r.logs.is_empty());

        let bogus = Transaction {
            to: Some(bob()),
            gas: 1_000_000,
            ..Default::default()
        };
        assert!(!executed(block.execute(&bogus, Address::zero(), true)).succeeded());
    }

    #[test]
    fn test_user_cannot_seal() {
        let evm = evm();
        let mut tx = transfer(0, DRIVER_ADDRESS, 0);
        tx.data = DriverCall::SealEpoch(1).encode();
        tx.gas = 100_000;
        let mut block = evm.begin(ctx(1_000_000));
        assert!(!executed(block.execute(&tx, alice(), false)).succeeded());
    }
}
