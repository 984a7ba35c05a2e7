//! # Scramble
//!
//! 1. Deduplicate by hash.
//! 2. Seed = `sha256(sorted hashes ‖ seed)`; the result is independent of
//!    input order.
//! 3. Order each sender's transactions by `(nonce asc, price desc, hash asc)`.
//! 4. Shuffle the sorted sender list with [`XorShiftStar`].
//! 5. Topologically sort with Kahn's algorithm, always emitting the ready
//!    transaction with the smallest `(sender rank, nonce, price desc, hash)`.
//!    Edges link consecutive transactions of one sender plus authorization
//!    dependencies. If authorization edges create a cycle the sort is redone
//!    without them.

use super::entry::ScramblerEntry;
use super::rng::XorShiftStar;
use shared_types::{sha256_concat, Address, Hash, U256};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};

#[derive(Clone, PartialEq, Eq)]
struct SortKey {
    rank: usize,
    nonce: u64,
    price: Reverse<U256>,
    hash: Hash,
    idx: usize,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rank, self.nonce, &self.price, self.hash).cmp(&(
            other.rank,
            other.nonce,
            &other.price,
            other.hash,
        ))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deterministically reorder `entries` under `seed`.
///
/// The output is a permutation of the deduplicated input and does not depend
/// on the input order.
#[tracing::instrument(skip(entries), fields(count = entries.len()))]
pub fn scramble<T: ScramblerEntry>(entries: Vec<T>, seed: u64) -> Vec<T> {
    let mut entries = dedup(entries);
    if entries.len() <= 1 {
        return entries;
    }

    let hashes: Vec<Hash> = entries.iter().map(|e| e.hash()).collect();
    let mut rng = XorShiftStar::new(derive_seed(&hashes, seed));

    let mut by_sender: BTreeMap<Address, Vec<usize>> = BTreeMap::new();
    for (i, e) in entries.iter().enumerate() {
        by_sender.entry(e.sender()).or_default().push(i);
    }
    let mut senders: Vec<Address> = by_sender.keys().copied().collect();
    rng.shuffle(&mut senders);
    let rank: HashMap<Address, usize> = senders.iter().enumerate().map(|(r, s)| (*s, r)).collect();

    let keys: Vec<SortKey> = entries
        .iter()
        .enumerate()
        .map(|(idx, e)| SortKey {
            rank: rank[&e.sender()],
            nonce: e.nonce(),
            price: Reverse(e.gas_price()),
            hash: e.hash(),
            idx,
        })
        .collect();

    let mut chain_edges = Vec::new();
    for txs in by_sender.values_mut() {
        txs.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
        for pair in txs.windows(2) {
            chain_edges.push((pair[0], pair[1]));
        }
    }

    let mut auth_edges = Vec::new();
    for (i, e) in entries.iter().enumerate() {
        for (authority, auth_nonce) in e.authorizations() {
            let Some(txs) = by_sender.get(&authority) else {
                continue;
            };
            for &j in txs {
                if j == i {
                    continue;
                }
                if entries[j].nonce() >= auth_nonce {
                    auth_edges.push((i, j));
                } else {
                    auth_edges.push((j, i));
                }
            }
        }
    }

    let mut all_edges = chain_edges.clone();
    all_edges.extend(auth_edges.iter().copied());
    let order = match kahn(&keys, &all_edges) {
        Some(order) => order,
        None => {
            tracing::debug!(
                edges = auth_edges.len(),
                "[sn-02] 🔀 Authorization cycle, ordering without authorization edges"
            );
            // Sender chains alone are acyclic.
            kahn(&keys, &chain_edges).unwrap_or_else(|| (0..keys.len()).collect())
        }
    };

    let mut slots: Vec<Option<T>> = entries.drain(..).map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

fn dedup<T: ScramblerEntry>(entries: Vec<T>) -> Vec<T> {
    let mut seen = HashMap::with_capacity(entries.len());
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        if seen.insert(e.hash(), ()).is_none() {
            out.push(e);
        }
    }
    out
}

fn derive_seed(hashes: &[Hash], seed: u64) -> u64 {
    let mut sorted = hashes.to_vec();
    sorted.sort();
    let seed_bytes = seed.to_be_bytes();
    let mut parts: Vec<&[u8]> = sorted.iter().map(|h| h.as_bytes()).collect();
    parts.push(&seed_bytes);
    let digest = sha256_concat(&parts);
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_be_bytes(first)
}

/// Kahn's sort with a min-heap ready set. `None` on a cycle.
fn kahn(keys: &[SortKey], edges: &[(usize, usize)]) -> Option<Vec<usize>> {
    let n = keys.len();
    let mut in_degree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(from, to) in edges {
        adjacency[from].push(to);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<SortKey>> = (0..n)
        .filter(|i| in_degree[*i] == 0)
        .map(|i| Reverse(keys[i].clone()))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(key)) = ready.pop() {
        order.push(key.idx);
        for &next in &adjacency[key.idx] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse(keys[next].clone()));
            }
        }
    }

    (order.len() == n).then_some(order)
}
