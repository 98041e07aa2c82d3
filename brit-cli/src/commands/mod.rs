//! CLI command implementations

pub mod accept;
pub mod exchange;
pub mod fees;
pub mod identity;
pub mod keygen;
pub mod request;
pub mod respond;
pub mod status;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

use brit_lib::fees::FeeScheduler;
use brit_lib::storage::FileExtensionStore;
use brit_lib::{MatcherResponse, SessionId, WalletIdentity};

use crate::config::CliConfig;
use crate::{ui, SeedArgs};

/// Directory holding the wallet's extension slots
pub fn slots_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("slots")
}

/// Session id of the request written by `brit request`, kept for `brit accept`
pub fn pending_session_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".pending-session")
}

/// Open the wallet's slot store, creating it if needed
pub fn open_slots(data_dir: &Path) -> Result<FileExtensionStore> {
    let dir = slots_dir(data_dir);
    FileExtensionStore::open(&dir).with_context(|| format!("opening slots in {}", dir.display()))
}

/// Read a file, naming it in the error
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

/// Write a file owner-readable only where the platform supports it
pub fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    // an existing file keeps its old mode through open
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Derive the wallet identity from `--seed` or `--seed-file`
pub fn load_identity(seed: &SeedArgs) -> Result<WalletIdentity> {
    let hex_seed = match (&seed.seed, &seed.seed_file) {
        (Some(hex_seed), _) => hex_seed.clone(),
        (None, Some(path)) => String::from_utf8(read_file(path)?)
            .with_context(|| format!("{} is not text", path.display()))?,
        (None, None) => return Err(anyhow!("a seed is required (--seed or --seed-file)")),
    };
    let bytes = hex::decode(hex_seed.trim()).context("seed must be hex")?;
    Ok(WalletIdentity::derive(&bytes)?)
}

pub fn scheduler(config: &CliConfig, identity: WalletIdentity) -> FeeScheduler {
    FeeScheduler::new(identity, config.network, config.fees.clone())
}

/// Parse an optional RFC 3339 date
pub fn parse_date(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(v)
                .map(|d| d.with_timezone(&Utc))
                .with_context(|| format!("invalid date {:?}, expected RFC 3339", v))
        })
        .transpose()
}

pub fn save_pending_session(data_dir: &Path, session: &SessionId) -> Result<()> {
    write_private(
        &pending_session_path(data_dir),
        hex::encode(session.as_bytes()).as_bytes(),
    )
}

pub fn load_pending_session(data_dir: &Path) -> Result<SessionId> {
    let path = pending_session_path(data_dir);
    let text = std::fs::read_to_string(&path)
        .with_context(|| "no pending request; run 'brit request' first".to_string())?;
    let bytes = hex::decode(text.trim()).context("pending session file is corrupted")?;
    Ok(SessionId::new(bytes)?)
}

pub fn print_response(response: &MatcherResponse) {
    ui::key_value(
        "Replay date",
        &response
            .replay_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "none".into()),
    );
    ui::key_value("Addresses", &response.addresses.len().to_string());
    for address in &response.addresses {
        println!("    {}", address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(None).unwrap(), None);
        let date = parse_date(Some("2020-01-02T03:04:05Z")).unwrap().unwrap();
        assert_eq!(date.timestamp(), 1_577_934_245);
        assert!(parse_date(Some("yesterday")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_private_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keys").join("matcher.sec.asc");
        write_private(&path, b"secret").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"secret");

        // a loose file left behind is tightened and overwritten
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        write_private(&path, b"new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_pending_session_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_pending_session(dir.path()).is_err());
        let session = SessionId::random();
        save_pending_session(dir.path(), &session).unwrap();
        assert_eq!(load_pending_session(dir.path()).unwrap(), session);
    }
}
