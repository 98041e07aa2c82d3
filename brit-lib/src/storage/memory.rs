//! In-memory extension slots.
//!
//! Useful for tests and for hosts that persist the wallet themselves. Lock
//! poisoning is reported as an error rather than a panic.

use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::{validate_slot, ExtensionStore, StorageError, StorageResult};

/// Slots held in a `HashMap` behind an `RwLock`.
#[derive(Debug)]
pub struct InMemoryExtensionStore {
    slots: RwLock<HashMap<String, Vec<u8>>>,
}

fn lock_error(context: &str) -> StorageError {
    StorageError::Internal(format!(
        "InMemoryExtensionStore: lock poisoned during {}",
        context
    ))
}

impl InMemoryExtensionStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of populated slots. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.slots.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryExtensionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionStore for InMemoryExtensionStore {
    fn get(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_slot(slot)?;
        let slots = self.slots.read().map_err(|_| lock_error("get"))?;
        Ok(slots.get(slot).cloned())
    }

    fn put(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
        validate_slot(slot)?;
        let mut slots = self.slots.write().map_err(|_| lock_error("put"))?;
        slots.insert(slot.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, slot: &str) -> StorageResult<()> {
        validate_slot(slot)?;
        let mut slots = self.slots.write().map_err(|_| lock_error("remove"))?;
        slots.remove(slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = InMemoryExtensionStore::new();
        assert_eq!(store.get("brit.a").unwrap(), None);

        store.put("brit.a", b"one").unwrap();
        store.put("brit.a", b"two").unwrap();
        assert_eq!(store.get("brit.a").unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);

        store.remove("brit.a").unwrap();
        store.remove("brit.a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_rejects_bad_slot() {
        let store = InMemoryExtensionStore::new();
        assert!(matches!(
            store.put("../x", b""),
            Err(StorageError::InvalidSlot(_))
        ));
    }
}
