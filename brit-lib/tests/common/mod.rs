//! Shared setup for integration tests.

#![allow(dead_code)]

use std::cell::Cell;

use brit_lib::crypto::{generate_key_pair, PublicKeyRing};
use brit_lib::matcher::{BucketAssigner, InMemoryMatcherStore, Matcher, MatcherConfig};
use brit_lib::payer::{MatcherClient, PayerConfig};
use brit_lib::transport::{Transport, TransportError};
use brit_lib::BitcoinAddress;

pub const POOL: &[&str] = &[
    "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
    "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
    "12c6DSiU4Rq3P4ZxziKxzrGxvLN6ZeN28",
    "1dice8EMZmqKvrGE4Qc9bUFf9PX3xaYDp",
    "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
    "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
];

pub fn pool() -> Vec<BitcoinAddress> {
    POOL.iter()
        .map(|s| BitcoinAddress::parse_any(s).unwrap())
        .collect()
}

pub fn matcher() -> (Matcher, PublicKeyRing) {
    let (public, secret) = generate_key_pair("matcher@test", "", chrono::Utc::now()).unwrap();
    let matcher = Matcher::new(
        secret,
        "",
        Box::new(BucketAssigner::new(pool(), 3).unwrap()),
        Box::new(InMemoryMatcherStore::new()),
        MatcherConfig::default(),
    );
    (matcher, public)
}

pub fn client(public: &PublicKeyRing) -> MatcherClient {
    MatcherClient::from_key_ring(
        public.to_armored().as_bytes(),
        PayerConfig::new("https://matcher.test/brit"),
    )
    .unwrap()
}

/// Fails every post with a fixed error and counts calls.
pub struct FailingTransport {
    pub error: TransportError,
    pub calls: Cell<usize>,
}

impl FailingTransport {
    pub fn new(error: TransportError) -> Self {
        Self {
            error,
            calls: Cell::new(0),
        }
    }
}

impl Transport for FailingTransport {
    fn post(&self, _: &str, _: &[u8], _: &str) -> Result<Vec<u8>, TransportError> {
        self.calls.set(self.calls.get() + 1);
        Err(self.error.clone())
    }
}
