//! Deterministic address choice.
//!
//! `index = SHA256(domain || identity || count as u64 BE) mod pool size`, read
//! as a big-endian u64 from the first eight digest bytes. Successive counts
//! walk the pool in a fixed, reproducible order per wallet.

use sha2::{Digest, Sha256};

use crate::address::BitcoinAddress;
use crate::identity::WalletIdentity;

const SELECTION_DOMAIN: &[u8] = b"brit-fee-address-v1";
const JITTER_DOMAIN: &[u8] = b"brit-fee-jitter-v1";

fn keyed_u64(domain: &[u8], identity: &WalletIdentity, count: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(identity.as_bytes());
    hasher.update(count.to_be_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Index into a pool of `pool_size` for the given send. `None` for an empty pool.
pub fn select_index(identity: &WalletIdentity, count: u64, pool_size: usize) -> Option<usize> {
    if pool_size == 0 {
        return None;
    }
    Some((keyed_u64(SELECTION_DOMAIN, identity, count) % pool_size as u64) as usize)
}

/// Pick the address for send number `count`.
pub fn select_address<'a>(
    identity: &WalletIdentity,
    count: u64,
    pool: &'a [BitcoinAddress],
) -> Option<&'a BitcoinAddress> {
    select_index(identity, count, pool.len()).map(|i| &pool[i])
}

/// Extra sends, in `0..bound`, before fee payment `count` is due.
pub fn send_jitter(identity: &WalletIdentity, count: u64, bound: u64) -> u64 {
    if bound == 0 {
        return 0;
    }
    keyed_u64(JITTER_DOMAIN, identity, count) % bound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<BitcoinAddress> {
        [
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
            "12c6DSiU4Rq3P4ZxziKxzrGxvLN6ZeN28",
        ]
        .iter()
        .map(|s| BitcoinAddress::parse_any(s).unwrap())
        .collect()
    }

    #[test]
    fn test_selection_is_reproducible() {
        let identity = WalletIdentity::derive(b"wallet").unwrap();
        let pool = pool();
        let first = select_address(&identity, 2, &pool).cloned();
        for _ in 0..10 {
            assert_eq!(select_address(&identity, 2, &pool).cloned(), first);
        }
        assert!(first.is_some());
    }

    #[test]
    fn test_selection_covers_pool() {
        let identity = WalletIdentity::derive(b"wallet").unwrap();
        let pool = pool();
        let mut seen = std::collections::HashSet::new();
        for count in 0..64 {
            seen.insert(select_index(&identity, count, pool.len()).unwrap());
        }
        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn test_empty_pool() {
        let identity = WalletIdentity::derive(b"wallet").unwrap();
        assert_eq!(select_address(&identity, 0, &[]), None);
    }

    #[test]
    fn test_jitter_bounds() {
        let identity = WalletIdentity::derive(b"wallet").unwrap();
        for count in 0..100 {
            assert!(send_jitter(&identity, count, 10) < 10);
        }
        assert_eq!(send_jitter(&identity, 5, 0), 0);
    }
}
