use thiserror::Error;

use super::model::Settings;

/// Longest grace delay accepted before a terminal state is shown.
const MAX_GRACE_DELAY_MS: u64 = 60_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`shell` must not be empty")]
    EmptyShell,

    #[error("`repo` must look like `owner/name`, got `{0}`")]
    InvalidRepo(String),

    #[error("`grace_delay_ms` is {0}, the maximum is {MAX_GRACE_DELAY_MS}")]
    GraceDelayTooLong(u64),

    #[error("`agent.interval_secs` must be at least 1")]
    ZeroInterval,

    #[error("`connectivity.host` must not be empty")]
    EmptyProbeHost,
}

/// Check every setting and return all problems found.
pub fn validate(settings: &Settings) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if settings.shell.trim().is_empty() {
        errors.push(ConfigError::EmptyShell);
    }

    let valid_repo = settings
        .repo
        .split_once('/')
        .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
    if !valid_repo {
        errors.push(ConfigError::InvalidRepo(settings.repo.clone()));
    }

    if settings.grace_delay_ms > MAX_GRACE_DELAY_MS {
        errors.push(ConfigError::GraceDelayTooLong(settings.grace_delay_ms));
    }

    if settings.agent.interval_secs == 0 {
        errors.push(ConfigError::ZeroInterval);
    }

    if settings.connectivity.host.trim().is_empty() {
        errors.push(ConfigError::EmptyProbeHost);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
