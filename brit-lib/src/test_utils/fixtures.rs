//! Test fixtures.

use chrono::Utc;

use crate::address::BitcoinAddress;
use crate::crypto::{generate_key_pair, PublicKeyRing};
use crate::identity::WalletIdentity;
use crate::matcher::{BucketAssigner, InMemoryMatcherStore, Matcher, MatcherConfig};
use crate::payer::{MatcherClient, PayerConfig};

const BASE58: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Identity derived from a 32-byte seed filled with `n`.
pub fn test_identity(n: u8) -> WalletIdentity {
    WalletIdentity::derive(&[n; 32]).expect("non-empty seed")
}

/// `n` distinct mainnet P2PKH-shaped addresses.
pub fn test_pool(n: usize) -> Vec<BitcoinAddress> {
    (0..n)
        .filter_map(|i| {
            let suffix = format!(
                "{}{}",
                BASE58[(i / BASE58.len()) % BASE58.len()] as char,
                BASE58[i % BASE58.len()] as char
            );
            BitcoinAddress::parse_any(&format!("1BvBMSEYstWetqTFn5Au4m4GFg7xJaN{}", suffix)).ok()
        })
        .collect()
}

/// A Matcher with an unprotected key, a pool of twelve addresses and
/// in-memory assignments, plus the public key ring Payers need.
pub struct MatcherFixture {
    pub matcher: Matcher,
    pub public_ring: PublicKeyRing,
}

pub fn test_matcher() -> MatcherFixture {
    test_matcher_with(MatcherConfig::default())
}

pub fn test_matcher_with(config: MatcherConfig) -> MatcherFixture {
    let (public_ring, secret_ring) =
        generate_key_pair("matcher@test", "", Utc::now()).expect("key generation");
    let assigner =
        BucketAssigner::new(test_pool(12), config.bucket_size).expect("valid test pool");
    let matcher = Matcher::new(
        secret_ring,
        "",
        Box::new(assigner),
        Box::new(InMemoryMatcherStore::new()),
        config,
    );
    MatcherFixture {
        matcher,
        public_ring,
    }
}

/// A client for `fixture`'s Matcher posting to a dummy URL.
pub fn test_client(fixture: &MatcherFixture) -> MatcherClient {
    MatcherClient::from_key_ring(
        &fixture.public_ring.to_bytes(),
        PayerConfig::new("https://matcher.test/brit"),
    )
    .expect("fixture key ring has an encryption key")
}
