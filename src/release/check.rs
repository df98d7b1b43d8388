use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use super::version::{read_installed_version, InstalledVersionError};
use super::{FetchError, GithubReleases, ReleaseLookup, VersionTag};
use crate::runner::Channel;

/// Result of comparing the installed application with the release feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    NewRelease {
        tag: VersionTag,
        installed: VersionTag,
    },
    UpToDate {
        tag: VersionTag,
        installed: VersionTag,
    },
    Snapshot {
        tag: VersionTag,
    },
    NoPrerelease,
    AppMissing,
}

impl CheckOutcome {
    pub fn from_lookup(channel: Channel, lookup: ReleaseLookup, installed: VersionTag) -> Self {
        match (channel, lookup) {
            (_, ReleaseLookup::NoPrereleaseFound) => CheckOutcome::NoPrerelease,
            (Channel::Snapshot, ReleaseLookup::Found(tag)) => CheckOutcome::Snapshot { tag },
            (Channel::Release, ReleaseLookup::Found(tag)) => {
                if tag.is_newer_release_than(&installed) {
                    CheckOutcome::NewRelease { tag, installed }
                } else {
                    CheckOutcome::UpToDate { tag, installed }
                }
            }
        }
    }

    pub fn update_available(&self) -> bool {
        matches!(self, CheckOutcome::NewRelease { .. })
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::NewRelease { tag, installed } => write!(
                f,
                "A new release {tag} is available. Installed version is {installed}."
            ),
            CheckOutcome::UpToDate { tag, installed } => write!(
                f,
                "MCreator is up to date with version {installed}. However, there may still be a newer patch update ({tag}) available."
            ),
            CheckOutcome::Snapshot { tag } => {
                write!(f, "The newest snapshot available is {tag}.")
            }
            CheckOutcome::NoPrerelease => f.write_str("No prereleases found."),
            CheckOutcome::AppMissing => f.write_str("MCreator.app not found in Applications."),
        }
    }
}

/// Read the installed version, then ask the feed for `channel`.
pub async fn check_for_update(
    releases: &GithubReleases,
    channel: Channel,
    app_path: &Path,
) -> Result<CheckOutcome, FetchError> {
    let installed = match read_installed_version(app_path) {
        Ok(v) => v,
        Err(e @ InstalledVersionError::AppNotFound(_)) => {
            debug!(error = %e, "no installed application");
            return Ok(CheckOutcome::AppMissing);
        }
        Err(e) => {
            warn!(error = %e, "installed version unreadable");
            return Ok(CheckOutcome::AppMissing);
        }
    };
    let lookup = releases.fetch_latest(channel).await?;
    Ok(CheckOutcome::from_lookup(channel, lookup, installed))
}
