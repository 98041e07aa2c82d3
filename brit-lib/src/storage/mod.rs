//! Wallet extension slots.
//!
//! The protocol persists two values per wallet, each as an opaque byte slot:
//! the last [`MatcherResponse`] and the [`SendFeeState`]. An empty or missing
//! slot means nothing has been stored yet.
//!
//! Callers read, compute and write a slot as one step and must not run two
//! exchanges for the same wallet at once; the stores do no cross-slot
//! locking.

mod file;
mod memory;
mod traits;

use tracing::warn;

use crate::codec::{decode_optional, WireFormat};
use crate::fees::SendFeeState;
use crate::messages::MatcherResponse;
use crate::Result;

pub use file::FileExtensionStore;
pub use memory::InMemoryExtensionStore;
pub use traits::{validate_slot, ExtensionStore, StorageError, StorageResult};

/// Slot holding the encoded [`MatcherResponse`].
pub const MATCHER_RESPONSE_SLOT: &str = "brit.matcher-response";

/// Slot holding the encoded [`SendFeeState`].
pub const SEND_FEE_STATE_SLOT: &str = "brit.send-fee-state";

/// Read and decode a slot, surfacing corruption as an error.
pub fn read_slot<T: WireFormat>(store: &dyn ExtensionStore, slot: &str) -> Result<Option<T>> {
    match store.get(slot)? {
        Some(bytes) => Ok(decode_optional(&bytes)?),
        None => Ok(None),
    }
}

/// Encode and write a slot.
pub fn write_slot<T: WireFormat>(
    store: &dyn ExtensionStore,
    slot: &str,
    value: &T,
) -> Result<()> {
    store.put(slot, &value.encode())?;
    Ok(())
}

fn read_slot_lenient<T: WireFormat>(store: &dyn ExtensionStore, slot: &str) -> Result<Option<T>> {
    match read_slot(store, slot) {
        Err(crate::BritError::Codec(err)) => {
            warn!(slot, error = %err, "stored slot is corrupted, treating as absent");
            Ok(None)
        }
        other => other,
    }
}

/// Load the stored Matcher response.
///
/// Corrupted content is logged and treated as absent so fee routing falls
/// back to the shipped address list. Storage failures are still returned.
pub fn load_matcher_response(store: &dyn ExtensionStore) -> Result<Option<MatcherResponse>> {
    read_slot_lenient(store, MATCHER_RESPONSE_SLOT)
}

pub fn store_matcher_response(
    store: &dyn ExtensionStore,
    response: &MatcherResponse,
) -> Result<()> {
    write_slot(store, MATCHER_RESPONSE_SLOT, response)
}

/// Load the stored fee schedule, treating corrupted content as absent.
pub fn load_send_fee_state(store: &dyn ExtensionStore) -> Result<Option<SendFeeState>> {
    read_slot_lenient(store, SEND_FEE_STATE_SLOT)
}

pub fn store_send_fee_state(store: &dyn ExtensionStore, state: &SendFeeState) -> Result<()> {
    write_slot(store, SEND_FEE_STATE_SLOT, state)
}

/// Forget everything the protocol stored for this wallet.
pub fn reset(store: &dyn ExtensionStore) -> Result<()> {
    store.remove(MATCHER_RESPONSE_SLOT)?;
    store.remove(SEND_FEE_STATE_SLOT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::BitcoinAddress;
    use crate::BritError;

    fn response() -> MatcherResponse {
        MatcherResponse::new(
            vec![BitcoinAddress::parse_any("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap()],
            None,
        )
    }

    #[test]
    fn test_store_and_load() {
        let store = InMemoryExtensionStore::new();
        assert_eq!(load_matcher_response(&store).unwrap(), None);
        assert_eq!(load_send_fee_state(&store).unwrap(), None);

        store_matcher_response(&store, &response()).unwrap();
        let state = SendFeeState {
            next_fee_send_count: Some(1),
            ..Default::default()
        };
        store_send_fee_state(&store, &state).unwrap();

        assert_eq!(load_matcher_response(&store).unwrap(), Some(response()));
        assert_eq!(load_send_fee_state(&store).unwrap(), Some(state));
    }

    #[test]
    fn test_empty_slot_is_absent() {
        let store = InMemoryExtensionStore::new();
        store.put(SEND_FEE_STATE_SLOT, b"").unwrap();
        assert_eq!(load_send_fee_state(&store).unwrap(), None);
    }

    #[test]
    fn test_corrupted_slot_is_absent_but_strict_read_fails() {
        let store = InMemoryExtensionStore::new();
        store.put(SEND_FEE_STATE_SLOT, b"12|garbage").unwrap();
        assert_eq!(load_send_fee_state(&store).unwrap(), None);
        assert!(matches!(
            read_slot::<SendFeeState>(&store, SEND_FEE_STATE_SLOT),
            Err(BritError::Codec(_))
        ));
        // the corrupted bytes are left for inspection
        assert_eq!(
            store.get(SEND_FEE_STATE_SLOT).unwrap(),
            Some(b"12|garbage".to_vec())
        );
    }

    #[test]
    fn test_reset() {
        let store = InMemoryExtensionStore::new();
        store_matcher_response(&store, &response()).unwrap();
        reset(&store).unwrap();
        assert!(store.is_empty());
    }
}
