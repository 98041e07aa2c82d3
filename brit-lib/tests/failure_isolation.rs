//! A failed exchange must leave both wallet slots untouched.

mod common;

use chrono::{TimeZone, Utc};

use brit_lib::crypto::generate_key_pair;
use brit_lib::fees::{FeePolicy, FeeScheduler, SendFeeState};
use brit_lib::payer::{sync_matcher_response, ExchangeState, MatcherClient, PayerConfig};
use brit_lib::storage::{
    self, ExtensionStore, InMemoryExtensionStore, MATCHER_RESPONSE_SLOT, SEND_FEE_STATE_SLOT,
};
use brit_lib::transport::{LoopbackTransport, TransportError};
use brit_lib::{BitcoinNetwork, BritError, MatcherResponse, WalletIdentity};

fn seeded_store() -> InMemoryExtensionStore {
    let store = InMemoryExtensionStore::new();
    let pool = common::pool();
    storage::store_matcher_response(
        &store,
        &MatcherResponse::new(
            pool[..2].to_vec(),
            Some(Utc.timestamp_opt(1_600_000_000, 0).unwrap()),
        ),
    )
    .unwrap();
    storage::store_send_fee_state(
        &store,
        &SendFeeState::committed(5, pool[1].clone())
            .with_last_fee_send_date(Some(Utc.timestamp_opt(1_650_000_000, 0).unwrap())),
    )
    .unwrap();
    store
}

fn snapshot(store: &InMemoryExtensionStore) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    (
        store.get(MATCHER_RESPONSE_SLOT).unwrap(),
        store.get(SEND_FEE_STATE_SLOT).unwrap(),
    )
}

fn scheduler() -> FeeScheduler {
    FeeScheduler::new(
        WalletIdentity::derive(&[2u8; 32]).unwrap(),
        BitcoinNetwork::Mainnet,
        FeePolicy::default(),
    )
}

#[test]
fn test_transport_errors_leave_slots_identical() {
    let (_, public) = common::matcher();
    let client = common::client(&public);

    for error in [
        TransportError::Timeout { timeout_ms: 30_000 },
        TransportError::Connection("connection refused".into()),
        TransportError::Status {
            status: 502,
            url: "https://matcher.test/brit".into(),
        },
        TransportError::Cancelled,
    ] {
        let store = seeded_store();
        let before = snapshot(&store);
        let transport = common::FailingTransport::new(error.clone());

        let outcome =
            sync_matcher_response(&client, &transport, &store, &scheduler(), None).unwrap();
        assert_eq!(outcome.state, ExchangeState::TransportFailed);
        assert_eq!(outcome.transport_error, Some(error));
        assert_eq!(transport.calls.get(), 1, "no retries");
        assert_eq!(snapshot(&store), before);
    }
}

#[test]
fn test_matcher_rejection_leaves_slots_identical() {
    let (matcher, _) = common::matcher();
    // client encrypts to a key the Matcher does not hold
    let (stranger, _) = generate_key_pair("stranger", "", Utc::now()).unwrap();
    let client = MatcherClient::from_key_ring(
        &stranger.to_bytes(),
        PayerConfig::new("https://matcher.test/brit"),
    )
    .unwrap();

    let store = seeded_store();
    let before = snapshot(&store);
    let outcome = sync_matcher_response(
        &client,
        &LoopbackTransport::new(&matcher),
        &store,
        &scheduler(),
        None,
    )
    .unwrap();
    assert_eq!(outcome.state, ExchangeState::TransportFailed);
    assert!(matches!(
        outcome.transport_error,
        Some(TransportError::Status { status: 400, .. })
    ));
    assert_eq!(snapshot(&store), before);
}

#[test]
fn test_undecryptable_reply_leaves_slots_identical() {
    struct Garbage;
    impl brit_lib::transport::Transport for Garbage {
        fn post(&self, _: &str, _: &[u8], _: &str) -> Result<Vec<u8>, TransportError> {
            Ok(b"<html>gateway error</html>".to_vec())
        }
    }

    let (_, public) = common::matcher();
    let client = common::client(&public);
    let store = seeded_store();
    let before = snapshot(&store);

    let err = sync_matcher_response(&client, &Garbage, &store, &scheduler(), None).unwrap_err();
    assert!(matches!(err, BritError::Crypto(_)));
    assert!(!err.is_retryable());
    assert_eq!(snapshot(&store), before);
}

#[test]
fn test_corrupted_slots_fall_back() {
    let store = InMemoryExtensionStore::new();
    store.put(MATCHER_RESPONSE_SLOT, b"\xff\xfe not text").unwrap();
    store.put(SEND_FEE_STATE_SLOT, b"nine|").unwrap();

    assert_eq!(storage::load_matcher_response(&store).unwrap(), None);
    assert_eq!(storage::load_send_fee_state(&store).unwrap(), None);
}
