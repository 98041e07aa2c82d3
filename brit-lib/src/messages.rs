//! Protocol message types.
//!
//! All values are immutable once built. A new exchange builds a new
//! [`PayerRequest`]; a new Matcher answer replaces the stored
//! [`MatcherResponse`] wholesale.

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::address::BitcoinAddress;
use crate::identity::WalletIdentity;
use crate::{BritError, Result};

/// Wire format version produced by this crate.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shortest accepted session id, in bytes.
pub const MIN_SESSION_ID_LEN: usize = 16;
/// Longest accepted session id, in bytes.
pub const MAX_SESSION_ID_LEN: usize = 64;
/// Length of session ids produced by [`SessionId::random`].
pub const DEFAULT_SESSION_ID_LEN: usize = 32;

/// Unpredictable value binding one request to its response.
///
/// The Matcher encrypts its response under this value, so it must never be
/// logged or reused.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    /// Wrap caller-supplied entropy.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if !(MIN_SESSION_ID_LEN..=MAX_SESSION_ID_LEN).contains(&bytes.len()) {
            return Err(BritError::invalid_data(
                "session id",
                format!(
                    "length {} outside {}..={}",
                    bytes.len(),
                    MIN_SESSION_ID_LEN,
                    MAX_SESSION_ID_LEN
                ),
            ));
        }
        Ok(Self(bytes))
    }

    /// Fresh session id from the operating system RNG.
    pub fn random() -> Self {
        let mut bytes = vec![0u8; DEFAULT_SESSION_ID_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({} bytes)", self.0.len())
    }
}

/// What a Payer tells the Matcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayerRequest {
    pub version: u32,
    pub identity: WalletIdentity,
    pub session_id: SessionId,
    /// Date of the wallet's earliest transaction, if it has any.
    pub first_transaction_date: Option<DateTime<Utc>>,
}

impl PayerRequest {
    pub fn new(identity: WalletIdentity, session_id: SessionId) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            identity,
            session_id,
            first_transaction_date: None,
        }
    }

    pub fn with_first_transaction_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.first_transaction_date = date;
        self
    }
}

/// Address pool returned by the Matcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherResponse {
    pub addresses: Vec<BitcoinAddress>,
    /// Earliest date from which the wallet should consider fees owed.
    pub replay_date: Option<DateTime<Utc>>,
}

impl MatcherResponse {
    pub fn new(addresses: Vec<BitcoinAddress>, replay_date: Option<DateTime<Utc>>) -> Self {
        Self {
            addresses,
            replay_date,
        }
    }

    /// True when the response carries no usable addresses.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn contains(&self, address: &BitcoinAddress) -> bool {
        self.addresses.contains(address)
    }
}

macro_rules! opaque_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn new(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn into_bytes(self) -> Vec<u8> {
                self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Whether the ciphertext is ASCII armored.
            pub fn is_armored(&self) -> bool {
                crate::crypto::is_armored(&self.0)
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({} bytes)", stringify!($name), self.0.len())
            }
        }
    };
}

opaque_bytes!(
    /// A [`PayerRequest`] encrypted to the Matcher's public key.
    EncryptedPayerRequest
);

opaque_bytes!(
    /// A [`MatcherResponse`] encrypted under the request's session id.
    EncryptedMatcherResponse
);
