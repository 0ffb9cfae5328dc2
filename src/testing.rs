//! Brute-force displacement search for small key sets, used only by tests.

use std::cmp::Reverse;

use crate::{ChdHasher, ChdHashes, ChdParts, Xxh3Hasher};

const MAX_SEED_ATTEMPTS: u64 = 1000;

pub(crate) fn build_parts<K, V>(entries: &[(K, V)]) -> ChdParts
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    build_parts_with_hasher(&Xxh3Hasher, entries)
}

/// Finds a seed and per-bucket displacements that place every key in its
/// own slot. Keys must be distinct.
pub(crate) fn build_parts_with_hasher<H, K, V>(hasher: &H, entries: &[(K, V)]) -> ChdParts
where
    H: ChdHasher,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let n = entries.len() as u64;
    if n == 0 {
        return ChdParts::default();
    }
    let index_len = (n / 2).max(1);

    for attempt in 0..MAX_SEED_ATTEMPTS {
        let seed = [attempt, attempt.wrapping_mul(0x9E37_79B9_7F4A_7C15)];
        let hashes: Vec<ChdHashes> = entries
            .iter()
            .map(|(k, _)| hasher.hash(k.as_ref(), seed[0], seed[1]))
            .collect();
        let Some(index) = displace(&hashes, n, index_len) else {
            continue;
        };

        let mut keys = vec![Vec::new(); n as usize];
        let mut values = vec![Vec::new(); n as usize];
        for ((k, v), h) in entries.iter().zip(&hashes) {
            let code = index[(h.h1 % index_len) as usize];
            let slot = slot_of(h, code / n, code % n, n) as usize;
            keys[slot] = k.as_ref().to_vec();
            values[slot] = v.as_ref().to_vec();
        }
        return ChdParts {
            seed,
            table_size: n,
            index,
            keys,
            values,
        };
    }
    panic!("no displacement found for {n} keys");
}

fn slot_of(h: &ChdHashes, d0: u64, d1: u64, n: u64) -> u64 {
    (h.h2 % n)
        .wrapping_add(d0.wrapping_mul(h.h3 % n))
        .wrapping_add(d1)
        % n
}

fn displace(hashes: &[ChdHashes], n: u64, index_len: u64) -> Option<Vec<u64>> {
    let mut buckets = vec![Vec::new(); index_len as usize];
    for (i, h) in hashes.iter().enumerate() {
        buckets[(h.h1 % index_len) as usize].push(i);
    }
    let mut order: Vec<usize> = (0..buckets.len()).collect();
    order.sort_by_key(|&b| Reverse(buckets[b].len()));

    let mut taken = vec![false; n as usize];
    let mut index = vec![0u64; index_len as usize];
    for b in order {
        let members = &buckets[b];
        if members.is_empty() {
            continue;
        }
        let (d0, d1, slots) = (0..n)
            .flat_map(|d0| (0..n).map(move |d1| (d0, d1)))
            .find_map(|(d0, d1)| {
                let mut slots: Vec<u64> = members
                    .iter()
                    .map(|&i| slot_of(&hashes[i], d0, d1, n))
                    .collect();
                if slots.iter().any(|&s| taken[s as usize]) {
                    return None;
                }
                slots.sort_unstable();
                slots.dedup();
                (slots.len() == members.len()).then_some((d0, d1, slots))
            })?;
        for s in slots {
            taken[s as usize] = true;
        }
        index[b] = d0 * n + d1;
    }
    Some(index)
}
