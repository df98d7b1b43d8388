use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::release::check::check_for_update;
use crate::runner::Channel;

pub async fn run(config_file: Option<&Path>, channel: Channel) -> Result<()> {
    let (_, settings) = super::load(config_file)?;
    let releases = super::releases(&settings)?;
    info!(repo = %releases.repo(), %channel, "checking for updates");

    let outcome = check_for_update(&releases, channel, &settings.app_path())
        .await
        .context("Could not check for updates")?;
    println!("{}", outcome);
    Ok(())
}
