//! # Basic Check
//!
//! Context-free sanity checks on the header and the carried transactions.

use crate::error::BasicError;
use shared_types::{EventPayload, Transaction, U256};
use std::collections::HashSet;

/// Counters above this are rejected to keep arithmetic far from overflow.
pub const MAX_COUNTER: u32 = i32::MAX as u32 / 2;

/// Gas values at or above this are rejected.
pub const MAX_GAS_VALUE: u64 = i64::MAX as u64;

fn is_negative(v: &U256) -> bool {
    v.bit(255)
}

/// Check one transaction.
pub fn check_tx(tx: &Transaction) -> Result<(), BasicError> {
    if is_negative(&tx.value) {
        return Err(BasicError::NegativeValue);
    }
    if is_negative(&tx.gas_fee_cap) || is_negative(&tx.gas_tip_cap) {
        return Err(BasicError::NegativeGasPrice);
    }
    match tx.intrinsic_gas() {
        Some(gas) if gas <= tx.gas => {}
        _ => return Err(BasicError::IntrinsicGas),
    }
    if tx.gas_fee_cap < tx.gas_tip_cap {
        return Err(BasicError::FeeCapBelowTip);
    }
    Ok(())
}

/// Validate the parts of `event` that need no context.
pub fn validate(event: &EventPayload) -> Result<(), BasicError> {
    let h = event.header();
    if h.seq == 0 || h.lamport == 0 || h.frame == 0 {
        return Err(BasicError::NotInited);
    }
    if h.seq >= MAX_COUNTER
        || h.lamport >= MAX_COUNTER
        || h.frame >= MAX_COUNTER
        || h.epoch >= MAX_COUNTER
        || h.gas_power_used >= MAX_GAS_VALUE
        || h.gas_power_left.max() >= MAX_GAS_VALUE
    {
        return Err(BasicError::HugeValue);
    }
    if h.creation_time == 0 || h.median_time == 0 {
        return Err(BasicError::ZeroTime);
    }
    if h.parents.is_empty() {
        if h.seq > 1 {
            return Err(BasicError::NoParents);
        }
        if h.lamport != 1 {
            return Err(BasicError::WrongLamport);
        }
    } else if h.lamport == 1 {
        return Err(BasicError::WrongLamport);
    }
    let mut seen = HashSet::with_capacity(h.parents.len());
    for p in &h.parents {
        if !seen.insert(p) {
            return Err(BasicError::DuplicateParents(*p));
        }
    }

    for tx in event.txs() {
        check_tx(tx)?;
    }
    if let Some(proposal) = event.payload().and_then(|p| p.proposal.as_ref()) {
        for tx in &proposal.transactions {
            check_tx(tx)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{EventHeader, EventId, EventSignature, Hash, MutableEventPayload};

    fn event(mutate: impl FnOnce(&mut MutableEventPayload)) -> EventPayload {
        let mut e = MutableEventPayload {
            header: EventHeader {
                version: 2,
                epoch: 1,
                seq: 1,
                frame: 1,
                lamport: 1,
                creator: 1,
                creation_time: 10,
                median_time: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        mutate(&mut e);
        e.build(EventSignature::default())
    }

    fn transfer() -> Transaction {
        Transaction {
            gas: 21_000,
            gas_fee_cap: U256::from(2u64),
            gas_tip_cap: U256::from(1u64),
            to: Some(Default::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_genesis_event() {
        assert_eq!(validate(&event(|_| {})), Ok(()));
    }

    #[test]
    fn test_not_inited() {
        assert_eq!(validate(&event(|e| e.header.seq = 0)), Err(BasicError::NotInited));
        assert_eq!(validate(&event(|e| e.header.frame = 0)), Err(BasicError::NotInited));
    }

    #[test]
    fn test_huge_values() {
        assert_eq!(
            validate(&event(|e| e.header.gas_power_used = u64::MAX)),
            Err(BasicError::HugeValue)
        );
        assert_eq!(
            validate(&event(|e| e.header.lamport = MAX_COUNTER)),
            Err(BasicError::HugeValue)
        );
    }

    #[test]
    fn test_zero_time() {
        assert_eq!(validate(&event(|e| e.header.median_time = 0)), Err(BasicError::ZeroTime));
    }

    #[test]
    fn test_parent_shape() {
        assert_eq!(validate(&event(|e| e.header.seq = 2)), Err(BasicError::NoParents));
        let p = EventId(Hash::repeat_byte(1));
        assert_eq!(
            validate(&event(|e| {
                e.header.parents = vec![p, p];
                e.header.lamport = 2;
            })),
            Err(BasicError::DuplicateParents(p))
        );
        assert_eq!(
            validate(&event(|e| e.header.parents = vec![p])),
            Err(BasicError::WrongLamport)
        );
    }

    #[test]
    fn test_tx_checks() {
        assert_eq!(check_tx(&transfer()), Ok(()));

        let mut low_gas = transfer();
        low_gas.gas = 20_999;
        assert_eq!(check_tx(&low_gas), Err(BasicError::IntrinsicGas));

        let mut inverted = transfer();
        inverted.gas_tip_cap = U256::from(3u64);
        assert_eq!(check_tx(&inverted), Err(BasicError::FeeCapBelowTip));

        let mut negative = transfer();
        negative.value = U256::MAX;
        assert_eq!(check_tx(&negative), Err(BasicError::NegativeValue));

        let e = event(|e| e.txs = vec![low_gas.clone()]);
        assert_eq!(validate(&e), Err(BasicError::IntrinsicGas));
    }
}
