//! Extension slot contract.

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("invalid slot id: {0}")]
    InvalidSlot(String),

    #[error("storage error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Opaque byte slots persisted alongside wallet data.
///
/// The core only reads and writes whole slots. A write replaces the previous
/// value completely or fails without changing it.
pub trait ExtensionStore: Send + Sync {
    /// Read a slot. `None` when nothing was ever written.
    fn get(&self, slot: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace a slot's contents.
    fn put(&self, slot: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Delete a slot. Removing a missing slot is not an error.
    fn remove(&self, slot: &str) -> StorageResult<()>;
}

impl<T: ExtensionStore + ?Sized> ExtensionStore for &T {
    fn get(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(slot)
    }

    fn put(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
        (**self).put(slot, bytes)
    }

    fn remove(&self, slot: &str) -> StorageResult<()> {
        (**self).remove(slot)
    }
}

/// Slot ids are short lowercase names such as `brit.send-fee-state`.
pub fn validate_slot(slot: &str) -> StorageResult<()> {
    let valid = !slot.is_empty()
        && slot.len() <= 64
        && !slot.starts_with('.')
        && slot
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidSlot(slot.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slot() {
        assert!(validate_slot("brit.matcher-response").is_ok());
        assert!(validate_slot("brit.send_fee_state2").is_ok());
        let long = "x".repeat(65);
        for bad in ["", ".hidden", "../escape", "Upper", "a/b", long.as_str()] {
            assert!(validate_slot(bad).is_err(), "{:?}", bad);
        }
    }
}
