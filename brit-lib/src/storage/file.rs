//! File-backed extension slots.
//!
//! Each slot is one file `<dir>/<slot>.bin`. Writes go to a temporary file in
//! the same directory which is then renamed over the old one, so a crash
//! leaves either the old or the new contents.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::traits::{validate_slot, ExtensionStore, StorageResult};

/// Slots stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FileExtensionStore {
    dir: PathBuf,
}

impl FileExtensionStore {
    /// Open (and create if needed) the slot directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> StorageResult<PathBuf> {
        validate_slot(slot)?;
        Ok(self.dir.join(format!("{}.bin", slot)))
    }
}

impl ExtensionStore for FileExtensionStore {
    fn get(&self, slot: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.slot_path(slot)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, slot: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.slot_path(slot)?;
        let tmp = self.dir.join(format!(".{}.tmp", slot));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(slot, bytes = bytes.len(), "wrote extension slot");
        Ok(())
    }

    fn remove(&self, slot: &str) -> StorageResult<()> {
        let path = self.slot_path(slot)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_and_persistence() {
        let dir = TempDir::new().unwrap();
        let store = FileExtensionStore::open(dir.path().join("slots")).unwrap();
        assert_eq!(store.get("brit.x").unwrap(), None);

        store.put("brit.x", b"hello").unwrap();
        let reopened = FileExtensionStore::open(dir.path().join("slots")).unwrap();
        assert_eq!(reopened.get("brit.x").unwrap(), Some(b"hello".to_vec()));

        reopened.remove("brit.x").unwrap();
        reopened.remove("brit.x").unwrap();
        assert_eq!(store.get("brit.x").unwrap(), None);
    }

    #[test]
    fn test_no_temp_files_left() {
        let dir = TempDir::new().unwrap();
        let store = FileExtensionStore::open(dir.path()).unwrap();
        store.put("brit.y", b"1").unwrap();
        store.put("brit.y", b"2").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["brit.y.bin".to_string()]);
    }

    #[test]
    fn test_empty_slot_is_some_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileExtensionStore::open(dir.path()).unwrap();
        store.put("brit.z", b"").unwrap();
        assert_eq!(store.get("brit.z").unwrap(), Some(Vec::new()));
    }
}
