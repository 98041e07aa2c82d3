//! BRIT fee-exchange protocol.
//!
//! A wallet (the Payer) and a fee service (the Matcher) exchange one pair of
//! encrypted messages: the Payer sends its [`WalletIdentity`] and a fresh
//! session id, the Matcher answers with the fee addresses assigned to that
//! identity. The wallet then pays periodic fees to those addresses on a
//! deterministic schedule, falling back to a shipped address list whenever no
//! Matcher response is available.
//!
//! The crate does no networking or persistence of its own. Both are reached
//! through traits: [`transport::Transport`] for the exchange and
//! [`storage::ExtensionStore`] for the two wallet slots.
//!
//! # Example
//!
//! ```
//! use brit_lib::crypto::generate_key_pair;
//! use brit_lib::matcher::{BucketAssigner, InMemoryMatcherStore, Matcher, MatcherConfig};
//! use brit_lib::payer::{MatcherClient, PayerConfig};
//! use brit_lib::transport::LoopbackTransport;
//! use brit_lib::{BitcoinAddress, WalletIdentity};
//!
//! let (public, secret) = generate_key_pair("matcher", "", chrono::Utc::now()).unwrap();
//! let pool = vec![
//!     BitcoinAddress::parse_any("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap(),
//!     BitcoinAddress::parse_any("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap(),
//! ];
//! let matcher = Matcher::new(
//!     secret,
//!     "",
//!     Box::new(BucketAssigner::new(pool, 2).unwrap()),
//!     Box::new(InMemoryMatcherStore::new()),
//!     MatcherConfig::default(),
//! );
//!
//! let client =
//!     MatcherClient::from_key_ring(&public.to_bytes(), PayerConfig::new("loopback")).unwrap();
//! let identity = WalletIdentity::derive(&[1u8; 32]).unwrap();
//! let outcome = client.exchange(&identity, None, &LoopbackTransport::new(&matcher)).unwrap();
//! assert_eq!(outcome.response.unwrap().addresses.len(), 2);
//! ```

pub mod address;
pub mod codec;
pub mod crypto;
pub mod errors;
pub mod fees;
pub mod identity;
pub mod matcher;
pub mod messages;
pub mod payer;
pub mod prelude;
pub mod storage;
pub mod transport;

/// Fixtures and mock collaborators for tests.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::{AddressError, BitcoinAddress, BitcoinNetwork};
pub use errors::{BritError, BritErrorCode};
pub use identity::{WalletIdentity, WALLET_IDENTITY_LEN};
pub use messages::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, PayerRequest, SessionId,
};

/// Common result alias for BRIT operations.
pub type Result<T> = std::result::Result<T, BritError>;
