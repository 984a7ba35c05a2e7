//! # Block Content
//!
//! Pure decisions taken when a consensus block ends: whether it yields a
//! block, which events contribute, which transactions run in which order and
//! where each transaction came from.

use shared_crypto::{recover_authority, SenderCache};
use shared_types::{
    Address, BlockNumber, EventId, EventPayload, Gas, Transaction, UnixNanos, ValidatorId,
    MAX_BLOCK_SIZE,
};
use sn_02_scrambler::{scramble, SenderTx};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Bytes reserved for the block header when filling a size-limited block.
pub const BLOCK_HEADER_SIZE_BOUND: u64 = 1024;

/// Inputs of the skip rule.
#[derive(Debug, Clone, Copy)]
pub struct SkipInputs {
    /// The Atropos already anchored an earlier block.
    pub atropos_reused: bool,
    /// Nothing to execute: no transaction-carrying events, or no proposal in
    /// single-proposer mode.
    pub empty: bool,
    /// The consensus block reported cheaters.
    pub has_cheaters: bool,
    /// Time of the candidate block.
    pub time: UnixNanos,
    /// Time of the last block.
    pub last_block_time: UnixNanos,
    /// `max_empty_block_skip_period` of the epoch.
    pub skip_period: UnixNanos,
}

/// True if the consensus block produces no block.
pub fn should_skip(inputs: &SkipInputs) -> bool {
    if inputs.atropos_reused {
        return true;
    }
    inputs.empty
        && !inputs.has_cheaters
        && inputs.time < inputs.last_block_time.saturating_add(inputs.skip_period)
}

/// Block time: the candidate time, forced past the parent.
pub fn block_time(candidate: UnixNanos, parent_time: UnixNanos) -> UnixNanos {
    candidate.max(parent_time + 1)
}

/// Drop the oldest events once the newest ones exhaust `max_block_gas`.
///
/// Walks from the newest event backwards summing `gas_power_used`; the event
/// that crosses the ceiling and everything before it are dropped. Returns the
/// kept events and the number dropped.
pub fn spill_events(
    events: Vec<Arc<EventPayload>>,
    max_block_gas: Gas,
) -> (Vec<Arc<EventPayload>>, usize) {
    let mut used: Gas = 0;
    let mut keep_from = 0;
    for (i, e) in events.iter().enumerate().rev() {
        used = used.saturating_add(e.header().gas_power_used);
        if used > max_block_gas {
            keep_from = i + 1;
            break;
        }
    }
    let mut events = events;
    let kept = events.split_off(keep_from);
    (kept, keep_from)
}

/// Where a transaction entered the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOrigin {
    /// Carrying event, zero for internal transactions.
    pub event: EventId,
    /// Index in that event or proposal.
    pub event_offset: u32,
    /// Creator of that event.
    pub creator: ValidatorId,
}

/// A transaction ready for execution.
#[derive(Debug, Clone)]
pub struct PlacedTx {
    /// The transaction.
    pub tx: Transaction,
    /// Recovered sender.
    pub sender: Address,
    /// Origin in the DAG.
    pub origin: TxOrigin,
}

/// Transactions of a classic block: the union of all events' transactions,
/// scrambled under `seed`.
///
/// Transactions whose sender cannot be recovered are dropped. With
/// `size_limit` set the scrambled list is cut before the first transaction
/// that would push the block past [`MAX_BLOCK_SIZE`].
pub fn legacy_transactions(
    events: &[Arc<EventPayload>],
    senders: &SenderCache,
    seed: BlockNumber,
    size_limit: bool,
) -> Vec<PlacedTx> {
    let mut origins = std::collections::HashMap::new();
    let mut entries = Vec::new();
    for event in events {
        for (offset, tx) in event.txs().iter().enumerate() {
            let hash = tx.hash();
            if origins.contains_key(&hash) {
                continue;
            }
            let sender = match senders.sender(tx) {
                Ok(sender) => sender,
                Err(e) => {
                    debug!(tx = ?hash, error = %e, "[sn-08] Dropping transaction without sender");
                    continue;
                }
            };
            origins.insert(
                hash,
                TxOrigin {
                    event: event.id(),
                    event_offset: offset as u32,
                    creator: event.creator(),
                },
            );
            entries.push(SenderTx::new(tx.clone(), sender, authorities(tx)));
        }
    }

    let mut size = BLOCK_HEADER_SIZE_BOUND;
    let mut out = Vec::with_capacity(entries.len());
    for entry in scramble(entries, seed) {
        if size_limit {
            size += entry.tx.size();
            if size > MAX_BLOCK_SIZE {
                break;
            }
        }
        let Some(origin) = origins.get(&entry.tx.hash()).copied() else {
            continue;
        };
        out.push(PlacedTx {
            tx: entry.tx,
            sender: entry.sender,
            origin,
        });
    }
    out
}

/// Transactions of a proposed block, in proposal order.
pub fn proposal_transactions(
    carrier: &EventPayload,
    txs: &[Transaction],
    senders: &SenderCache,
) -> Vec<PlacedTx> {
    let mut seen = HashSet::new();
    txs.iter()
        .enumerate()
        .filter(|(_, tx)| seen.insert(tx.hash()))
        .filter_map(|(offset, tx)| {
            let sender = senders.sender(tx).ok()?;
            Some(PlacedTx {
                tx: tx.clone(),
                sender,
                origin: TxOrigin {
                    event: carrier.id(),
                    event_offset: offset as u32,
                    creator: carrier.creator(),
                },
            })
        })
        .collect()
}

fn authorities(tx: &Transaction) -> Vec<(Address, u64)> {
    tx.authorizations
        .iter()
        .filter_map(|auth| recover_authority(auth).ok().map(|a| (a, auth.nonce)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared_crypto::{Secp256k1KeyPair, TxSigner};
    use shared_types::{
        EventHeader, EventSignature, MutableEventPayload, TxType, EVENT_VERSION_2, U256,
    };

    fn event(
        creator: ValidatorId,
        lamport: u32,
        gas: Gas,
        txs: Vec<Transaction>,
    ) -> Arc<EventPayload> {
        let mut m = MutableEventPayload {
            header: EventHeader {
                version: EVENT_VERSION_2,
                epoch: 1,
                seq: 1,
                frame: 1,
                lamport,
                creator,
                creation_time: 1,
                median_time: 1,
                gas_power_used: gas,
                ..Default::default()
            },
            txs,
            ..Default::default()
        };
        m.header.payload_hash = m.compute_payload_hash();
        Arc::new(m.build(EventSignature([0u8; 64])))
    }

    fn signed(key: &Secp256k1KeyPair, nonce: u64, data: usize) -> Transaction {
        let tx = Transaction {
            tx_type: TxType::DynamicFee,
            nonce,
            gas: 21_000 + 16 * data as u64,
            gas_fee_cap: U256::from(10u64),
            to: Some(Address::repeat_byte(1)),
            data: vec![1; data],
            ..Default::default()
        };
        TxSigner::new(1).sign(tx, key).unwrap()
    }

    fn skip(atropos_reused: bool, empty: bool, has_cheaters: bool, time: u64) -> bool {
        should_skip(&SkipInputs {
            atropos_reused,
            empty,
            has_cheaters,
            time,
            last_block_time: 100,
            skip_period: 50,
        })
    }

    #[test]
    fn test_skip_rule() {
        assert!(skip(true, false, true, 1000), "reused atropos always skips");
        assert!(skip(false, true, false, 149));
        assert!(!skip(false, true, false, 150), "skip period elapsed");
        assert!(!skip(false, true, true, 120), "cheaters force a block");
        assert!(!skip(false, false, false, 120));
    }

    #[test]
    fn test_block_time_advances() {
        assert_eq!(block_time(50, 100), 101);
        assert_eq!(block_time(200, 100), 200);
    }

    #[test]
    fn test_spill_drops_oldest() {
        let events: Vec<_> = (1..=5).map(|i| event(1, i, 10, vec![])).collect();
        let (kept, dropped) = spill_events(events.clone(), 25);
        assert_eq!(dropped, 3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id(), events[3].id());

        let (kept, dropped) = spill_events(events, 50);
        assert_eq!((kept.len(), dropped), (5, 0));
    }

    #[test]
    fn test_legacy_dedup_and_origin() {
        let key = Secp256k1KeyPair::generate();
        let senders = SenderCache::new(TxSigner::new(1), 64);
        let a = signed(&key, 0, 0);
        let b = signed(&key, 1, 0);
        let e1 = event(1, 1, 0, vec![a.clone()]);
        let e2 = event(2, 2, 0, vec![b.clone(), a.clone()]);
        let txs = legacy_transactions(&[e1.clone(), e2.clone()], &senders, 7, false);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].tx.nonce, 0);
        assert_eq!(txs[0].origin.event, e1.id());
        assert_eq!(txs[1].origin.event, e2.id());
        assert_eq!(txs[1].origin.creator, 2);
        assert_eq!(txs[0].sender, key.address());
    }

    #[test]
    fn test_legacy_unsigned_dropped() {
        let senders = SenderCache::new(TxSigner::new(1), 64);
        let unsigned = Transaction {
            nonce: 0,
            ..Default::default()
        };
        let txs = legacy_transactions(&[event(1, 1, 0, vec![unsigned])], &senders, 1, false);
        assert!(txs.is_empty());
    }

    #[test]
    fn test_legacy_size_limit() {
        let senders = SenderCache::new(TxSigner::new(1), 256);
        let keys: Vec<_> = (0..8).map(|_| Secp256k1KeyPair::generate()).collect();
        let mut events = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            let txs = (0..10).map(|n| signed(key, n, 125_000)).collect();
            events.push(event(i as u32 + 1, i as u32 + 1, 0, txs));
        }
        let limited = legacy_transactions(&events, &senders, 3, true);
        let size: u64 = limited.iter().map(|t| t.tx.size()).sum();
        assert!(size + BLOCK_HEADER_SIZE_BOUND <= MAX_BLOCK_SIZE);
        assert!(limited.len() >= 60 && limited.len() < 80);
        let all = legacy_transactions(&events, &senders, 3, false);
        assert_eq!(all.len(), 80);
        let all_size: u64 = all.iter().map(|t| t.tx.size()).sum();
        assert!(all_size > MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_proposal_order_kept() {
        let key = Secp256k1KeyPair::generate();
        let senders = SenderCache::new(TxSigner::new(1), 64);
        let txs = vec![signed(&key, 1, 0), signed(&key, 0, 0)];
        let carrier = event(3, 1, 0, vec![]);
        let placed = proposal_transactions(&carrier, &txs, &senders);
        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].tx.nonce, 1);
        assert_eq!(placed[1].origin.event_offset, 1);
        assert_eq!(placed[1].origin.creator, 3);
    }

    proptest! {
        #[test]
        fn prop_spill_keeps_largest_fitting_suffix(
            gas in prop::collection::vec(0u64..100, 0..20),
            max in 0u64..500,
        ) {
            let events: Vec<_> = gas
                .iter()
                .enumerate()
                .map(|(i, g)| event(1, i as u32 + 1, *g, vec![]))
                .collect();
            let (kept, dropped) = spill_events(events, max);
            prop_assert_eq!(kept.len() + dropped, gas.len());
            let kept_gas: u64 = gas[dropped..].iter().sum();
            prop_assert!(kept_gas <= max);
            if dropped > 0 {
                prop_assert!(kept_gas + gas[dropped - 1] > max);
            }
        }

        #[test]
        fn prop_block_time_after_parent(candidate in 0u64..u64::MAX / 2, parent in 0u64..u64::MAX / 2) {
            let t = block_time(candidate, parent);
            prop_assert!(t > parent);
            prop_assert!(t >= candidate);
        }
    }
}
