//! Identity command - derive the wallet identity

use anyhow::Result;

use crate::{ui, SeedArgs};

pub fn run(seed: &SeedArgs) -> Result<()> {
    let identity = super::load_identity(seed)?;
    ui::header("Wallet Identity");
    ui::key_value("Identity", &identity.to_hex());
    Ok(())
}
