//! Respond command - serve a request as the Matcher

use anyhow::{Context, Result};
use std::path::Path;

use brit_lib::crypto::SecretKeyRing;
use brit_lib::matcher::{BucketAssigner, JsonFileMatcherStore, Matcher};
use brit_lib::EncryptedPayerRequest;

use crate::config::CliConfig;
use crate::ui;

pub const ASSIGNMENTS_FILE: &str = "assignments.json";

pub fn run(
    data_dir: &Path,
    config: &CliConfig,
    secret_key: &Path,
    pool: &Path,
    request: &Path,
    out: &Path,
    passphrase: &str,
) -> Result<()> {
    let secret_ring = SecretKeyRing::from_bytes(&super::read_file(secret_key)?)
        .with_context(|| format!("loading secret key from {}", secret_key.display()))?;
    let pool_text = std::fs::read_to_string(pool)
        .with_context(|| format!("reading pool {}", pool.display()))?;
    let assigner =
        BucketAssigner::from_lines(
        &pool_text,
        config.matcher.network,
        config.matcher.bucket_size,
    )?;
    let store_path = data_dir.join("matcher").join(ASSIGNMENTS_FILE);
    let store = JsonFileMatcherStore::open(&store_path)?;

    let matcher = Matcher::new(
        secret_ring,
        passphrase,
        Box::new(assigner),
        Box::new(store),
        config.matcher.clone(),
    );

    let encrypted = EncryptedPayerRequest::new(super::read_file(request)?);
    let response = matcher
        .handle(&encrypted)
        .context("matcher could not serve the request")?;

    std::fs::write(out, response.as_bytes())
        .with_context(|| format!("writing {}", out.display()))?;
    ui::success("Encrypted response written");
    ui::key_value("Response", &out.display().to_string());
    ui::key_value("Assignments", &store_path.display().to_string());
    Ok(())
}
