//! Matcher side of the exchange.
//!
//! A [`Matcher`] decrypts a payer request with its secret key ring, looks up
//! or assigns the identity's address pool, and encrypts the response under the
//! request's session id. An assignment is only stored once the encrypted
//! response exists, so the Matcher never commits a pool it could not report.

mod assignment;
mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::address::{BitcoinAddress, BitcoinNetwork};
use crate::codec::{CodecError, WireFormat};
use crate::crypto::{CryptoBox, CryptoError, EncryptOptions, SecretKeyRing};
use crate::identity::WalletIdentity;
use crate::messages::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, PayerRequest, SessionId,
};
use crate::storage::StorageError;

pub use assignment::{AddressAssigner, BucketAssigner, MIN_BUCKET_SIZE};
pub use store::{InMemoryMatcherStore, JsonFileMatcherStore, MatcherRecord, MatcherStore};

/// Why a request could not be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatcherError {
    #[error("request decryption failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("request decoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("assignment store failed: {0}")]
    Storage(#[from] StorageError),

    #[error("address pool is empty")]
    EmptyPool,

    #[error("invalid matcher configuration: {0}")]
    Config(String),
}

impl MatcherError {
    /// Status an HTTP front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Crypto(_) | Self::Codec(_) => 400,
            Self::Storage(_) => 503,
            Self::EmptyPool | Self::Config(_) => 500,
        }
    }
}

/// Matcher settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Addresses per assignment bucket.
    #[serde(default = "default_bucket_size")]
    pub bucket_size: usize,

    /// Armor encrypted responses.
    #[serde(default = "default_armor_responses")]
    pub armor_responses: bool,

    /// Network the address pool belongs to.
    #[serde(default)]
    pub network: BitcoinNetwork,
}

fn default_bucket_size() -> usize {
    3
}

fn default_armor_responses() -> bool {
    true
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            bucket_size: default_bucket_size(),
            armor_responses: default_armor_responses(),
            network: BitcoinNetwork::default(),
        }
    }
}

impl MatcherConfig {
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_armor_responses(mut self, armor: bool) -> Self {
        self.armor_responses = armor;
        self
    }

    pub fn with_network(mut self, network: BitcoinNetwork) -> Self {
        self.network = network;
        self
    }
}

/// Addresses chosen for one request, not yet committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub addresses: Vec<BitcoinAddress>,
    /// Stored record for a returning identity.
    pub existing: Option<MatcherRecord>,
}

impl Assignment {
    pub fn is_new(&self) -> bool {
        self.existing.is_none()
    }

    /// Replay date to report for a request.
    ///
    /// Returning identities get the earlier of their first-seen date and the
    /// payer's first transaction; new ones get the payer's date.
    pub fn replay_date(
        &self,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match (&self.existing, first_transaction_date) {
            (Some(record), Some(first_tx)) => Some(record.first_seen.min(first_tx)),
            (Some(record), None) => Some(record.first_seen),
            (None, first_tx) => first_tx,
        }
    }
}

/// Serves encrypted payer requests.
pub struct Matcher {
    secret_keys: SecretKeyRing,
    passphrase: Zeroizing<String>,
    assigner: Box<dyn AddressAssigner>,
    store: Box<dyn MatcherStore>,
    config: MatcherConfig,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("keys", &self.secret_keys.keys().len())
            .field("config", &self.config)
            .finish()
    }
}

impl Matcher {
    pub fn new(
        secret_keys: SecretKeyRing,
        passphrase: impl Into<String>,
        assigner: Box<dyn AddressAssigner>,
        store: Box<dyn MatcherStore>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            secret_keys,
            passphrase: Zeroizing::new(passphrase.into()),
            assigner,
            store,
            config,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Decrypt and decode a payer request.
    pub fn decrypt_payer_request(
        &self,
        encrypted: &EncryptedPayerRequest,
    ) -> Result<PayerRequest, MatcherError> {
        let plaintext = Zeroizing::new(CryptoBox::decrypt(
            encrypted.as_bytes(),
            &self.secret_keys,
            &self.passphrase,
        )?);
        Ok(PayerRequest::decode(&plaintext)?)
    }

    /// The pool for `identity`: the stored one for a returning identity,
    /// otherwise a fresh assignment. Nothing is written.
    ///
    /// Every address must belong to the configured network.
    pub fn lookup_or_assign_addresses(
        &self,
        identity: &WalletIdentity,
    ) -> Result<Assignment, MatcherError> {
        if let Some(record) = self.store.get(identity)? {
            if !record.addresses.is_empty() {
                self.check_network(&record.addresses)?;
                return Ok(Assignment {
                    addresses: record.addresses.clone(),
                    existing: Some(record),
                });
            }
            warn!(?identity, "stored assignment has no addresses, reassigning");
        }

        let addresses = self.assigner.assign(identity)?;
        if addresses.is_empty() {
            return Err(MatcherError::EmptyPool);
        }
        self.check_network(&addresses)?;
        Ok(Assignment {
            addresses,
            existing: None,
        })
    }

    fn check_network(&self, addresses: &[BitcoinAddress]) -> Result<(), MatcherError> {
        let network = self.config.network;
        match addresses
            .iter()
            .find(|a| BitcoinAddress::parse(a.as_str(), network).is_err())
        {
            Some(address) => Err(MatcherError::Config(format!(
                "address {} is not a {} address",
                address,
                network.as_str()
            ))),
            None => Ok(()),
        }
    }

    /// Encode a response and encrypt it under the request's session id.
    pub fn build_and_encrypt_response(
        &self,
        addresses: Vec<BitcoinAddress>,
        replay_date: Option<DateTime<Utc>>,
        session_id: &SessionId,
    ) -> Result<EncryptedMatcherResponse, MatcherError> {
        let response = MatcherResponse::new(addresses, replay_date);
        let options = EncryptOptions::default().with_armor(self.config.armor_responses);
        let ciphertext =
            CryptoBox::encrypt_with_session(&response.encode(), session_id.as_bytes(), &options)?;
        Ok(EncryptedMatcherResponse::new(ciphertext))
    }

    /// Serve one encrypted request.
    pub fn handle(
        &self,
        encrypted: &EncryptedPayerRequest,
    ) -> Result<EncryptedMatcherResponse, MatcherError> {
        self.handle_at(encrypted, Utc::now())
    }

    /// [`Matcher::handle`] with an explicit clock.
    #[instrument(skip(self, encrypted), fields(request_bytes = encrypted.len()))]
    pub fn handle_at(
        &self,
        encrypted: &EncryptedPayerRequest,
        now: DateTime<Utc>,
    ) -> Result<EncryptedMatcherResponse, MatcherError> {
        let request = self.decrypt_payer_request(encrypted).map_err(|e| {
            warn!(error = %e, "rejected payer request");
            e
        })?;

        let assignment = self.lookup_or_assign_addresses(&request.identity)?;
        let replay_date = assignment.replay_date(request.first_transaction_date);
        let response = self.build_and_encrypt_response(
            assignment.addresses.clone(),
            replay_date,
            &request.session_id,
        )?;

        if assignment.is_new() {
            self.store.put(
                &request.identity,
                MatcherRecord {
                    addresses: assignment.addresses.clone(),
                    first_seen: now,
                },
            )?;
            debug!(identity = ?request.identity, "stored new assignment");
        }

        info!(
            identity = ?request.identity,
            addresses = assignment.addresses.len(),
            returning = !assignment.is_new(),
            "served payer request"
        );
        Ok(response)
    }
}
