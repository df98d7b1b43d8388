pub mod agent;
pub mod check;
pub mod doctor;
pub mod update;
pub mod watch;

use std::path::{Path, PathBuf};

use crate::config::model::Settings;
use crate::config::{load_settings, resolve::resolve_config};
use crate::release::GithubReleases;

/// Resolve and load the settings for a command.
pub fn load(config_file: Option<&Path>) -> anyhow::Result<(PathBuf, Settings)> {
    let path = resolve_config(config_file)?;
    let settings = load_settings(&path)?;
    Ok((path, settings))
}

pub fn releases(settings: &Settings) -> anyhow::Result<GithubReleases> {
    Ok(GithubReleases::new(&settings.api_base, &settings.repo)?)
}
