//! Payer side of the exchange.
//!
//! [`MatcherClient`] walks one exchange through its states:
//!
//! ```text
//! Idle -> RequestBuilt -> RequestEncrypted -> ResponseReceived -> ResponseDecrypted -> Done
//!                                          \-> TransportFailed
//! ```
//!
//! A transport failure is a normal outcome: the wallet keeps using whatever
//! it stored before (or the fallback addresses) and tries again later. Nothing
//! is persisted unless the response decrypted and decoded cleanly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::codec::WireFormat;
use crate::crypto::{CryptoBox, EncryptOptions, PublicKey};
use crate::fees::FeeScheduler;
use crate::identity::WalletIdentity;
use crate::messages::{
    EncryptedMatcherResponse, EncryptedPayerRequest, MatcherResponse, PayerRequest, SessionId,
};
use crate::storage::{self, ExtensionStore};
use crate::transport::{Transport, TransportError};
use crate::Result;

/// Payer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerConfig {
    /// Matcher endpoint requests are posted to.
    pub matcher_url: String,

    /// Timeout handed to the transport.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Armor encrypted requests.
    #[serde(default = "default_armor")]
    pub armor: bool,

    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_armor() -> bool {
    true
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

impl PayerConfig {
    pub fn new(matcher_url: impl Into<String>) -> Self {
        Self {
            matcher_url: matcher_url.into(),
            timeout_secs: default_timeout_secs(),
            armor: default_armor(),
            content_type: default_content_type(),
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_armor(mut self, armor: bool) -> Self {
        self.armor = armor;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Where an exchange attempt stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    Idle,
    RequestBuilt,
    RequestEncrypted,
    ResponseReceived,
    ResponseDecrypted,
    Done,
    /// Terminal and non-fatal; retry the whole exchange later.
    TransportFailed,
}

impl ExchangeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::TransportFailed)
    }
}

/// How an exchange ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub state: ExchangeState,
    /// Present only when `state` is [`ExchangeState::Done`].
    pub response: Option<MatcherResponse>,
    /// Present only when `state` is [`ExchangeState::TransportFailed`].
    pub transport_error: Option<TransportError>,
}

impl ExchangeOutcome {
    fn done(response: MatcherResponse) -> Self {
        Self {
            state: ExchangeState::Done,
            response: Some(response),
            transport_error: None,
        }
    }

    fn transport_failed(err: TransportError) -> Self {
        Self {
            state: ExchangeState::TransportFailed,
            response: None,
            transport_error: Some(err),
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ExchangeState::Done
    }
}

/// Talks to one Matcher on behalf of a wallet.
#[derive(Clone, Debug)]
pub struct MatcherClient {
    matcher_key: PublicKey,
    config: PayerConfig,
}

impl MatcherClient {
    pub fn new(matcher_key: PublicKey, config: PayerConfig) -> Self {
        Self {
            matcher_key,
            config,
        }
    }

    /// Build a client from the Matcher's published key ring, binary or
    /// armored.
    pub fn from_key_ring(key_ring: &[u8], config: PayerConfig) -> Result<Self> {
        let matcher_key = CryptoBox::read_public_key(key_ring)?;
        Ok(Self::new(matcher_key, config))
    }

    pub fn config(&self) -> &PayerConfig {
        &self.config
    }

    pub fn matcher_key(&self) -> &PublicKey {
        &self.matcher_key
    }

    pub fn create_payer_request(
        &self,
        identity: &WalletIdentity,
        session_id: SessionId,
        first_transaction_date: Option<DateTime<Utc>>,
    ) -> PayerRequest {
        PayerRequest::new(*identity, session_id)
            .with_first_transaction_date(first_transaction_date)
    }

    pub fn encrypt_payer_request(&self, request: &PayerRequest) -> Result<EncryptedPayerRequest> {
        let options = EncryptOptions::default().with_armor(self.config.armor);
        let ciphertext = CryptoBox::encrypt(&request.encode(), &self.matcher_key, &options)?;
        Ok(EncryptedPayerRequest::new(ciphertext))
    }

    /// Post the request once. No retries.
    pub fn perform_exchange<T: Transport + ?Sized>(
        &self,
        encrypted: &EncryptedPayerRequest,
        transport: &T,
    ) -> std::result::Result<EncryptedMatcherResponse, TransportError> {
        let body = transport.post(
            &self.config.matcher_url,
            encrypted.as_bytes(),
            &self.config.content_type,
        )?;
        Ok(EncryptedMatcherResponse::new(body))
    }

    /// Decrypt a response with the session id of the request it answers.
    pub fn decrypt_matcher_response(
        &self,
        encrypted: &EncryptedMatcherResponse,
        session_id: &SessionId,
    ) -> Result<MatcherResponse> {
        open_matcher_response(encrypted, session_id)
    }

    /// Run one full exchange.
    ///
    /// Transport failures end in [`ExchangeState::TransportFailed`]; crypto
    /// and codec failures are returned as errors.
    #[instrument(skip(self, transport), fields(url = %self.config.matcher_url))]
    pub fn exchange<T: Transport + ?Sized>(
        &self,
        identity: &WalletIdentity,
        first_transaction_date: Option<DateTime<Utc>>,
        transport: &T,
    ) -> Result<ExchangeOutcome> {
        let session_id = SessionId::random();
        let request =
            self.create_payer_request(identity, session_id.clone(), first_transaction_date);
        debug!(state = ?ExchangeState::RequestBuilt);

        let encrypted = self.encrypt_payer_request(&request)?;
        debug!(state = ?ExchangeState::RequestEncrypted, bytes = encrypted.len());

        let reply = match self.perform_exchange(&encrypted, transport) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "matcher exchange failed");
                return Ok(ExchangeOutcome::transport_failed(err));
            }
        };
        debug!(state = ?ExchangeState::ResponseReceived, bytes = reply.len());

        let response = self.decrypt_matcher_response(&reply, &session_id)?;
        debug!(state = ?ExchangeState::ResponseDecrypted);

        info!(addresses = response.addresses.len(), "matcher exchange complete");
        Ok(ExchangeOutcome::done(response))
    }
}

/// Decrypt and decode a response using the session id of its request.
///
/// Needs no Matcher key, so a response received out of band can be opened
/// by whoever kept the session id.
pub fn open_matcher_response(
    encrypted: &EncryptedMatcherResponse,
    session_id: &SessionId,
) -> Result<MatcherResponse> {
    let plaintext = CryptoBox::decrypt_with_session(encrypted.as_bytes(), session_id.as_bytes())?;
    Ok(MatcherResponse::decode(&plaintext)?)
}

/// Store a freshly received response and re-pick a committed fee address
/// that is no longer in the pool.
///
/// If the fee schedule cannot be written, the previous response is put back
/// so the two slots never disagree.
pub fn persist_matcher_response(
    store: &dyn ExtensionStore,
    scheduler: &FeeScheduler,
    response: &MatcherResponse,
) -> Result<()> {
    let reconciled = match storage::load_send_fee_state(store)? {
        Some(state) => {
            let reconciled = scheduler.reconcile(&state, Some(response));
            (reconciled != state).then_some(reconciled)
        }
        None => None,
    };
    let previous = store.get(storage::MATCHER_RESPONSE_SLOT)?;

    storage::store_matcher_response(store, response)?;

    let Some(state) = reconciled else {
        return Ok(());
    };
    debug!("fee address re-picked from the new pool");
    if let Err(err) = storage::store_send_fee_state(store, &state) {
        let restored = match previous {
            Some(bytes) => store.put(storage::MATCHER_RESPONSE_SLOT, &bytes),
            None => store.remove(storage::MATCHER_RESPONSE_SLOT),
        };
        if let Err(restore_err) = restored {
            warn!(error = %restore_err, "could not restore previous matcher response");
        }
        return Err(err);
    }
    Ok(())
}

/// Exchange with the Matcher and persist the result.
///
/// On success the response slot is replaced and a committed fee address that
/// is not in the new pool is re-picked. On any failure both slots are left
/// exactly as they were.
pub fn sync_matcher_response<T: Transport + ?Sized>(
    client: &MatcherClient,
    transport: &T,
    store: &dyn ExtensionStore,
    scheduler: &FeeScheduler,
    first_transaction_date: Option<DateTime<Utc>>,
) -> Result<ExchangeOutcome> {
    let outcome = client.exchange(scheduler.identity(), first_transaction_date, transport)?;
    let Some(response) = outcome.response.as_ref() else {
        return Ok(outcome);
    };

    persist_matcher_response(store, scheduler, response)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{BitcoinAddress, BitcoinNetwork};
    use crate::crypto::generate_key_pair;
    use crate::fees::{FeePolicy, SendFeeState};
    use crate::storage::{
        InMemoryExtensionStore, StorageError, StorageResult, MATCHER_RESPONSE_SLOT,
        SEND_FEE_STATE_SLOT,
    };
    use crate::BritError;
    use std::cell::Cell;

    struct Fixed {
        reply: std::result::Result<Vec<u8>, TransportError>,
        calls: Cell<usize>,
    }

    impl Transport for Fixed {
        fn post(
            &self,
            _url: &str,
            _payload: &[u8],
            _content_type: &str,
        ) -> std::result::Result<Vec<u8>, TransportError> {
            self.calls.set(self.calls.get() + 1);
            self.reply.clone()
        }
    }

    fn client() -> MatcherClient {
        let (public, _) = generate_key_pair("matcher", "", Utc::now()).unwrap();
        MatcherClient::new(
            public.first_encryption_key().unwrap().clone(),
            PayerConfig::new("https://matcher.example/brit"),
        )
    }

    #[test]
    fn test_transport_failure_is_terminal_state() {
        let transport = Fixed {
            reply: Err(TransportError::Timeout { timeout_ms: 30_000 }),
            calls: Cell::new(0),
        };
        let identity = WalletIdentity::derive(b"wallet").unwrap();
        let outcome = client().exchange(&identity, None, &transport).unwrap();
        assert_eq!(outcome.state, ExchangeState::TransportFailed);
        assert!(outcome.state.is_terminal());
        assert!(outcome.response.is_none());
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn test_reply_under_wrong_session_is_rejected() {
        let response = MatcherResponse::new(
            vec![BitcoinAddress::parse_any("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap()],
            None,
        );
        let foreign = CryptoBox::encrypt_with_session(
            &response.encode(),
            SessionId::random().as_bytes(),
            &EncryptOptions::default(),
        )
        .unwrap();
        let transport = Fixed {
            reply: Ok(foreign),
            calls: Cell::new(0),
        };
        let identity = WalletIdentity::derive(b"wallet").unwrap();
        let err = client().exchange(&identity, None, &transport).unwrap_err();
        assert!(matches!(err, BritError::Crypto(_)));
    }

    #[test]
    fn test_request_is_armored_by_default() {
        let c = client();
        let request = c.create_payer_request(
            &WalletIdentity::derive(b"w").unwrap(),
            SessionId::random(),
            None,
        );
        assert!(c.encrypt_payer_request(&request).unwrap().is_armored());

        let binary = MatcherClient::new(
            c.matcher_key().clone(),
            PayerConfig::new("https://m").with_armor(false),
        );
        assert!(!binary.encrypt_payer_request(&request).unwrap().is_armored());
    }

    struct FeeSlotReadOnly {
        inner: InMemoryExtensionStore,
    }

    impl ExtensionStore for FeeSlotReadOnly {
        fn get(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
            self.inner.get(slot)
        }

        fn put(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
            if slot == SEND_FEE_STATE_SLOT {
                return Err(StorageError::Io("disk full".into()));
            }
            self.inner.put(slot, bytes)
        }

        fn remove(&self, slot: &str) -> StorageResult<()> {
            self.inner.remove(slot)
        }
    }

    fn response(addresses: &[&str]) -> MatcherResponse {
        MatcherResponse::new(
            addresses
                .iter()
                .map(|a| BitcoinAddress::parse_any(a).unwrap())
                .collect(),
            None,
        )
    }

    #[test]
    fn test_failed_fee_write_keeps_previous_response() {
        let scheduler = FeeScheduler::new(
            WalletIdentity::derive(&[3u8; 32]).unwrap(),
            BitcoinNetwork::Mainnet,
            FeePolicy::default(),
        );
        let old = response(&["1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"]);
        let state = SendFeeState::committed(
            4,
            BitcoinAddress::parse_any("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap(),
        );

        let inner = InMemoryExtensionStore::new();
        storage::store_matcher_response(&inner, &old).unwrap();
        storage::store_send_fee_state(&inner, &state).unwrap();
        let store = FeeSlotReadOnly { inner };
        let before_response = store.get(MATCHER_RESPONSE_SLOT).unwrap();
        let before_state = store.get(SEND_FEE_STATE_SLOT).unwrap();

        let new = response(&[
            "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
            "12c6DSiU4Rq3P4ZxziKxzrGxvLN6ZeN28",
        ]);
        let err = persist_matcher_response(&store, &scheduler, &new).unwrap_err();
        assert!(matches!(err, BritError::Storage(StorageError::Io(_))));
        assert_eq!(store.get(MATCHER_RESPONSE_SLOT).unwrap(), before_response);
        assert_eq!(store.get(SEND_FEE_STATE_SLOT).unwrap(), before_state);
    }

    #[test]
    fn test_failed_fee_write_without_previous_response() {
        let scheduler = FeeScheduler::new(
            WalletIdentity::derive(&[3u8; 32]).unwrap(),
            BitcoinNetwork::Mainnet,
            FeePolicy::default(),
        );
        let inner = InMemoryExtensionStore::new();
        let state = SendFeeState::committed(
            1,
            BitcoinAddress::parse_any("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy").unwrap(),
        );
        storage::store_send_fee_state(&inner, &state).unwrap();
        let store = FeeSlotReadOnly { inner };

        let new = response(&["1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"]);
        assert!(persist_matcher_response(&store, &scheduler, &new).is_err());
        assert_eq!(store.get(MATCHER_RESPONSE_SLOT).unwrap(), None);
    }

    #[test]
    fn test_config_defaults() {
        let config: PayerConfig =
            serde_json::from_str(r#"{"matcher_url":"https://m.example"}"#).unwrap();
        assert_eq!(config, PayerConfig::new("https://m.example"));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.content_type, "application/octet-stream");
    }
}
