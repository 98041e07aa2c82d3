//! Fees command - evaluate the fee schedule against the stored slots

use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use brit_lib::fees::{PoolSource, SendFeeState, WalletActivity};
use brit_lib::storage;

use crate::config::CliConfig;
use crate::{ui, SeedArgs};

pub fn run(
    data_dir: &Path,
    config: &CliConfig,
    seed: &SeedArgs,
    sends: u64,
    commit: bool,
) -> Result<()> {
    let identity = super::load_identity(seed)?;
    let scheduler = super::scheduler(config, identity);
    let store = super::open_slots(data_dir)?;
    let now = Utc::now();

    let response = storage::load_matcher_response(&store)?;
    let state = storage::load_send_fee_state(&store)?.unwrap_or_default();
    let decision = scheduler.evaluate(
        &state,
        &WalletActivity::new(sends),
        response.as_ref(),
        now,
    );

    ui::header("Fee Schedule");
    ui::key_value(
        "Address pool",
        match decision.source {
            PoolSource::Matcher => "matcher",
            PoolSource::Fallback => "fallback",
        },
    );
    print_state(&decision.state);
    ui::key_value(
        "Sends needed",
        &scheduler
            .threshold(decision.state.next_fee_send_count.unwrap_or(0))
            .to_string(),
    );

    let next_state = match (&decision.due, commit) {
        (Some(due), true) => {
            ui::success(&format!(
                "Recorded fee #{} of {} sats to {}",
                due.send_count, due.amount_sats, due.address
            ));
            scheduler.record_fee_sent(&decision.state, response.as_ref(), now)
        }
        (Some(due), false) => {
            ui::info(&format!(
                "Fee due: {} sats to {} (pass --commit once sent)",
                due.amount_sats, due.address
            ));
            decision.state
        }
        (None, _) => {
            ui::info("No fee due");
            decision.state
        }
    };

    if next_state != state {
        storage::store_send_fee_state(&store, &next_state)?;
        tracing::debug!("fee schedule updated");
    }
    Ok(())
}

pub fn print_state(state: &SendFeeState) {
    ui::key_value(
        "Next fee",
        &state
            .next_fee_send_count
            .map(|c| format!("#{}", c))
            .unwrap_or_else(|| "not scheduled".into()),
    );
    ui::key_value(
        "Next address",
        &state
            .next_fee_send_address
            .as_ref()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "none".into()),
    );
    ui::key_value(
        "Last fee sent",
        &state
            .last_fee_send_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "never".into()),
    );
}
