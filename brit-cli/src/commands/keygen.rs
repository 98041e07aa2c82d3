//! Keygen command - create a Matcher key pair

use anyhow::{bail, Result};
use chrono::Utc;
use std::path::Path;

use brit_lib::crypto::generate_key_pair;

use crate::ui;

pub const PUBLIC_KEY_FILE: &str = "matcher.pub.asc";
pub const SECRET_KEY_FILE: &str = "matcher.sec.asc";

pub fn run(out: &Path, user_id: &str, protect: bool, force: bool, verbose: bool) -> Result<()> {
    ui::header("Generate Matcher Keys");

    let public_path = out.join(PUBLIC_KEY_FILE);
    let secret_path = out.join(SECRET_KEY_FILE);

    if secret_path.exists() && !force {
        if !ui::is_interactive() {
            bail!("{} exists; pass --force to overwrite", secret_path.display());
        }
        if !ui::confirm("Keys already exist. Overwrite?", false)? {
            ui::info("Keygen cancelled");
            return Ok(());
        }
    }

    let passphrase = if protect {
        ui::password("Passphrase for the secret key", true)?
    } else {
        String::new()
    };

    if verbose {
        ui::info(&format!("Generating key for '{}'...", user_id));
    }
    let spinner = ui::spinner("Generating key pair...");
    let (public, secret) = generate_key_pair(user_id, &passphrase, Utc::now())?;
    spinner.finish_and_clear();

    std::fs::create_dir_all(out)?;
    std::fs::write(&public_path, public.to_armored())?;
    super::write_private(&secret_path, secret.to_armored().as_bytes())?;

    ui::success("Matcher key pair created");
    ui::separator();
    if let Some(key) = public.first_encryption_key() {
        ui::key_value("Key id", &key.key_id().to_string());
    }
    ui::key_value("Public key", &public_path.display().to_string());
    ui::key_value("Secret key", &secret_path.display().to_string());
    if !protect {
        ui::warning("Secret key is not passphrase protected");
    }
    Ok(())
}
