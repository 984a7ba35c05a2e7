//! # Epoch Check
//!
//! Checks an event against the rules of the current epoch: membership,
//! DAG limits, event version, declared gas and which transactions the
//! upgrades permit.

use super::gas_power::check_gas_used;
use crate::error::{CheckError, EpochError, Result};
use shared_types::{EpochState, EventPayload, Rules, Transaction, TxType};

/// True if `tx_type` is enabled by `rules`.
pub fn tx_type_allowed(tx_type: TxType, rules: &Rules) -> bool {
    let u = &rules.upgrades;
    match tx_type {
        TxType::Legacy => true,
        TxType::AccessList => u.berlin,
        TxType::DynamicFee => u.london,
        TxType::Blob => false,
        TxType::SetCode => u.allegro,
    }
}

/// Check one transaction against epoch rules.
pub fn check_tx(tx: &Transaction, rules: &Rules) -> std::result::Result<(), EpochError> {
    if !tx_type_allowed(tx.tx_type, rules) {
        return Err(EpochError::TxTypeNotAllowed(tx.tx_type.as_byte()));
    }
    if tx.gas_fee_cap < rules.economy.min_gas_price {
        return Err(EpochError::UnderpricedTx);
    }
    Ok(())
}

/// Validate `event` against `epoch`.
pub fn validate(event: &EventPayload, epoch: &EpochState) -> Result<()> {
    let h = event.header();
    if h.epoch != epoch.epoch {
        if h.epoch < epoch.epoch {
            return Err(CheckError::EventTooLate);
        }
        return Err(EpochError::WrongEpoch {
            got: h.epoch,
            expected: epoch.epoch,
        }
        .into());
    }
    if !epoch.validators.exists(h.creator) {
        return Err(EpochError::AuthFailure(h.creator).into());
    }

    let rules = &epoch.rules;
    if h.parents.len() > rules.dag.max_parents as usize {
        return Err(EpochError::TooManyParents {
            got: h.parents.len(),
            max: rules.dag.max_parents,
        }
        .into());
    }
    if h.extra.len() > rules.dag.max_extra_data as usize {
        return Err(EpochError::TooBigExtra {
            got: h.extra.len(),
            max: rules.dag.max_extra_data,
        }
        .into());
    }
    let expected = rules.upgrades.expected_event_version();
    if h.version != expected {
        return Err(EpochError::WrongVersion {
            got: h.version,
            expected,
        }
        .into());
    }
    check_gas_used(event, rules)?;

    for tx in event.txs() {
        check_tx(tx, rules)?;
    }
    if let Some(proposal) = event.payload().and_then(|p| p.proposal.as_ref()) {
        for tx in &proposal.transactions {
            check_tx(tx, rules)?;
        }
    }
    Ok(())
}
