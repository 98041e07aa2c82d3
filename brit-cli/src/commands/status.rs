//! Status command - show and reset the stored slots

use anyhow::{bail, Result};
use serde_json::json;
use std::path::Path;

use brit_lib::storage;

use crate::ui;

pub fn run(data_dir: &Path, as_json: bool) -> Result<()> {
    let store = super::open_slots(data_dir)?;
    let response = storage::load_matcher_response(&store)?;
    let state = storage::load_send_fee_state(&store)?;
    let pending = super::pending_session_path(data_dir).exists();

    if as_json {
        ui::json(&json!({
            "data_dir": data_dir.display().to_string(),
            "matcher_response": response,
            "send_fee_state": state,
            "pending_request": pending,
        }));
        return Ok(());
    }

    ui::header("BRIT Status");
    ui::key_value("Data directory", &data_dir.display().to_string());

    ui::header("Matcher Response");
    match &response {
        Some(response) => super::print_response(response),
        None => ui::info("None stored; fees use the fallback addresses"),
    }

    ui::header("Fee Schedule");
    match &state {
        Some(state) => super::fees::print_state(state),
        None => ui::info("Not started"),
    }

    if pending {
        ui::warning("A request is waiting for its response ('brit accept')");
    }
    Ok(())
}

pub fn reset(data_dir: &Path, yes: bool) -> Result<()> {
    if !yes {
        if !ui::is_interactive() {
            bail!("pass --yes to reset without a prompt");
        }
        if !ui::confirm("Forget the stored Matcher response and fee schedule?", false)? {
            ui::info("Reset cancelled");
            return Ok(());
        }
    }
    let store = super::open_slots(data_dir)?;
    storage::reset(&store)?;
    ui::success("Stored slots cleared");
    Ok(())
}
