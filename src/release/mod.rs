pub mod check;
pub mod github;
pub mod version;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use check::CheckOutcome;
pub use github::GithubReleases;

// ---------------------------------------------------------------------------
// VersionTag
// ---------------------------------------------------------------------------

/// A release tag or bundle version such as `2024.3.45318`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading dotted numeric components. A leading `v` is ignored and
    /// parsing stops at the first component that is not a number.
    pub fn components(&self) -> Vec<u64> {
        let s = self.0.strip_prefix(['v', 'V']).unwrap_or(&self.0);
        s.split('.')
            .map_while(|part| part.parse::<u64>().ok())
            .collect()
    }

    /// MCreator releases are named `<year>.<n>.<build>` and a release line
    /// is its year. A tag is a newer release only when its year is later;
    /// `2024.4` against an installed `2024.3.45318` is a patch of the same
    /// line, not a new release.
    pub fn is_newer_release_than(&self, installed: &VersionTag) -> bool {
        match (self.components().first(), installed.components().first()) {
            (Some(ours), Some(theirs)) => ours > theirs,
            _ => false,
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ReleaseLookup / FetchError
// ---------------------------------------------------------------------------

/// A successful answer from the release listing. An empty snapshot feed is
/// a valid answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseLookup {
    Found(VersionTag),
    NoPrereleaseFound,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("release request failed")]
    Http(#[from] reqwest::Error),

    #[error("release listing returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("release listing is not valid JSON")]
    Parse(#[from] serde_json::Error),

    #[error("GitHub API rate limit exceeded, try again later")]
    RateLimited,
}

impl FetchError {
    /// Errors worth another attempt: connection problems, timeouts and
    /// server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Parse(_) | FetchError::RateLimited => false,
        }
    }
}
