//! Exchange command - HTTP round trip with a Matcher

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::CliConfig;
use crate::SeedArgs;

#[cfg(feature = "http-transport")]
pub fn run(
    data_dir: &Path,
    config: &CliConfig,
    seed: &SeedArgs,
    key: &Path,
    url: Option<String>,
    first_tx: Option<&str>,
) -> Result<()> {
    use anyhow::Context;
    use brit_lib::payer::{sync_matcher_response, MatcherClient};
    use brit_lib::transport::HttpTransport;

    use crate::ui;

    let identity = super::load_identity(seed)?;
    let first_tx = super::parse_date(first_tx)?;
    let payer = config
        .payer_for(url)
        .ok_or_else(|| anyhow!("no matcher URL; pass --url or set payer.matcher_url"))?;
    let transport = HttpTransport::with_timeout_secs(payer.timeout_secs)?;
    let client = MatcherClient::from_key_ring(&super::read_file(key)?, payer)
        .with_context(|| format!("loading matcher key from {}", key.display()))?;
    let store = super::open_slots(data_dir)?;

    ui::header("Matcher Exchange");
    ui::key_value("Matcher", &client.config().matcher_url);

    let spinner = ui::spinner("Exchanging with matcher...");
    let outcome = sync_matcher_response(
        &client,
        &transport,
        &store,
        &super::scheduler(config, identity),
        first_tx,
    );
    spinner.finish_and_clear();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            ui::error("Matcher reply rejected; stored data left unchanged");
            return Err(e.into());
        }
    };
    match (outcome.response, outcome.transport_error) {
        (Some(response), _) => {
            ui::success("Matcher response stored");
            super::print_response(&response);
        }
        (None, error) => {
            ui::warning("Matcher unreachable; stored data left unchanged");
            if let Some(error) = error {
                ui::key_value("Reason", &error.to_string());
            }
            ui::info("Fees keep using the stored or fallback addresses. Try again later.");
        }
    }
    Ok(())
}

#[cfg(not(feature = "http-transport"))]
pub fn run(
    _data_dir: &Path,
    _config: &CliConfig,
    _seed: &SeedArgs,
    _key: &Path,
    _url: Option<String>,
    _first_tx: Option<&str>,
) -> Result<()> {
    Err(anyhow!(
        "this build has no HTTP transport; rebuild with --features http-transport"
    ))
}
