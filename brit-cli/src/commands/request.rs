//! Request command - write an encrypted Payer request

use anyhow::{Context, Result};
use std::path::Path;

use brit_lib::payer::{MatcherClient, PayerConfig};
use brit_lib::SessionId;

use crate::config::CliConfig;
use crate::{ui, SeedArgs};

pub fn run(
    data_dir: &Path,
    config: &CliConfig,
    seed: &SeedArgs,
    key: &Path,
    out: &Path,
    first_tx: Option<&str>,
) -> Result<()> {
    let identity = super::load_identity(seed)?;
    let first_tx = super::parse_date(first_tx)?;
    let payer = config
        .payer_for(None)
        .unwrap_or_else(|| PayerConfig::new("file"));
    let client = MatcherClient::from_key_ring(&super::read_file(key)?, payer)
        .with_context(|| format!("loading matcher key from {}", key.display()))?;

    let session = SessionId::random();
    let request = client.create_payer_request(&identity, session.clone(), first_tx);
    let encrypted = client.encrypt_payer_request(&request)?;

    std::fs::write(out, encrypted.as_bytes())
        .with_context(|| format!("writing {}", out.display()))?;
    super::save_pending_session(data_dir, &session)?;

    ui::success("Encrypted request written");
    ui::key_value("Identity", &identity.to_hex());
    ui::key_value("Matcher key", &client.matcher_key().key_id().to_string());
    ui::key_value("Request", &out.display().to_string());
    ui::info("Send the request to the Matcher, then run 'brit accept' with its response");
    Ok(())
}
