//! Accept command - open a Matcher response and store it

use anyhow::{Context, Result};
use std::path::Path;

use brit_lib::payer::{open_matcher_response, persist_matcher_response};
use brit_lib::EncryptedMatcherResponse;

use crate::config::CliConfig;
use crate::{ui, SeedArgs};

pub fn run(data_dir: &Path, config: &CliConfig, seed: &SeedArgs, response: &Path) -> Result<()> {
    let identity = super::load_identity(seed)?;
    let session = super::load_pending_session(data_dir)?;
    let encrypted = EncryptedMatcherResponse::new(super::read_file(response)?);

    let response = match open_matcher_response(&encrypted, &session) {
        Ok(response) => response,
        Err(e) => {
            ui::error("Response does not answer the pending request");
            return Err(e).context("opening matcher response");
        }
    };

    let store = super::open_slots(data_dir)?;
    persist_matcher_response(&store, &super::scheduler(config, identity), &response)?;
    std::fs::remove_file(super::pending_session_path(data_dir))?;

    ui::success("Matcher response stored");
    super::print_response(&response);
    Ok(())
}
