//! Matcher-side assignment storage.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::BitcoinAddress;
use crate::identity::WalletIdentity;
use crate::storage::StorageError;

/// What the Matcher remembers about one wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherRecord {
    pub addresses: Vec<BitcoinAddress>,
    /// When the identity was first served.
    pub first_seen: DateTime<Utc>,
}

/// Persistence for identity to address assignments.
pub trait MatcherStore: Send + Sync {
    fn get(&self, identity: &WalletIdentity) -> Result<Option<MatcherRecord>, StorageError>;

    fn put(&self, identity: &WalletIdentity, record: MatcherRecord) -> Result<(), StorageError>;

    /// Drop an assignment, e.g. when rotating a pool.
    fn remove(&self, identity: &WalletIdentity) -> Result<(), StorageError>;
}

fn lock_error(context: &str) -> StorageError {
    StorageError::Internal(format!("matcher store: lock poisoned during {}", context))
}

/// Assignments held in memory.
#[derive(Debug, Default)]
pub struct InMemoryMatcherStore {
    records: RwLock<HashMap<WalletIdentity, MatcherRecord>>,
}

impl InMemoryMatcherStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored assignments. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MatcherStore for InMemoryMatcherStore {
    fn get(&self, identity: &WalletIdentity) -> Result<Option<MatcherRecord>, StorageError> {
        let records = self.records.read().map_err(|_| lock_error("get"))?;
        Ok(records.get(identity).cloned())
    }

    fn put(&self, identity: &WalletIdentity, record: MatcherRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| lock_error("put"))?;
        records.insert(*identity, record);
        Ok(())
    }

    fn remove(&self, identity: &WalletIdentity) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| lock_error("remove"))?;
        records.remove(identity);
        Ok(())
    }
}

/// Assignments kept in one JSON file keyed by identity hex.
///
/// The whole file is rewritten on every change; suitable for small
/// deployments and the command-line tool.
#[derive(Debug)]
pub struct JsonFileMatcherStore {
    path: PathBuf,
    records: RwLock<HashMap<String, MatcherRecord>>,
}

impl JsonFileMatcherStore {
    /// Open the store, loading existing assignments if the file exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Internal(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    fn flush(&self, records: &HashMap<String, MatcherRecord>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl MatcherStore for JsonFileMatcherStore {
    fn get(&self, identity: &WalletIdentity) -> Result<Option<MatcherRecord>, StorageError> {
        let records = self.records.read().map_err(|_| lock_error("get"))?;
        Ok(records.get(&identity.to_hex()).cloned())
    }

    fn put(&self, identity: &WalletIdentity, record: MatcherRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| lock_error("put"))?;
        let previous = records.insert(identity.to_hex(), record);
        if let Err(e) = self.flush(&records) {
            // keep memory and disk in agreement
            match previous {
                Some(previous) => records.insert(identity.to_hex(), previous),
                None => records.remove(&identity.to_hex()),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, identity: &WalletIdentity) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| lock_error("remove"))?;
        if records.remove(&identity.to_hex()).is_some() {
            self.flush(&records)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record() -> MatcherRecord {
        MatcherRecord {
            addresses: vec![
                BitcoinAddress::parse_any("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap(),
            ],
            first_seen: Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_in_memory() {
        let store = InMemoryMatcherStore::new();
        let identity = WalletIdentity::derive(b"a").unwrap();
        assert_eq!(store.get(&identity).unwrap(), None);
        store.put(&identity, record()).unwrap();
        assert_eq!(store.get(&identity).unwrap(), Some(record()));
        store.remove(&identity).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_file_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("matcher").join("assignments.json");
        let identity = WalletIdentity::derive(b"b").unwrap();

        let store = JsonFileMatcherStore::open(&path).unwrap();
        store.put(&identity, record()).unwrap();

        let reopened = JsonFileMatcherStore::open(&path).unwrap();
        assert_eq!(reopened.get(&identity).unwrap(), Some(record()));

        reopened.remove(&identity).unwrap();
        let again = JsonFileMatcherStore::open(&path).unwrap();
        assert_eq!(again.get(&identity).unwrap(), None);
    }

    #[test]
    fn test_json_file_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assignments.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(JsonFileMatcherStore::open(&path).is_err());
    }

    #[test]
    fn test_json_file_rejects_invalid_address() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assignments.json");
        let identity = WalletIdentity::derive(b"c").unwrap();
        let json = format!(
            r#"{{"{}": {{"addresses": ["1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa\n1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2"], "first_seen": "2020-09-13T12:26:40Z"}}}}"#,
            identity.to_hex()
        );
        fs::write(&path, json).unwrap();
        assert!(matches!(
            JsonFileMatcherStore::open(&path),
            Err(StorageError::Internal(_))
        ));
    }
}
