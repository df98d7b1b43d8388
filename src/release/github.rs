use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FetchError, ReleaseLookup, VersionTag};
use crate::runner::Channel;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_REPO: &str = "MCreator/MCreator";

/// Number of recent releases inspected when looking for a prerelease.
const RECENT_RELEASES: u32 = 5;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of the GitHub releases API. Only the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRecord {
    pub tag_name: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
}

/// The first published prerelease, in listing order (newest first).
pub fn select_prerelease(records: &[ReleaseRecord]) -> Option<&ReleaseRecord> {
    records.iter().find(|r| r.prerelease && !r.draft)
}

/// Client for the releases of one GitHub repository.
#[derive(Debug, Clone)]
pub struct GithubReleases {
    client: reqwest::Client,
    api_base: String,
    repo: String,
}

impl GithubReleases {
    pub fn new(api_base: &str, repo: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("mupdater/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Latest tag for `channel`. Release asks for the single latest record;
    /// snapshot scans the few most recent records for a prerelease.
    pub async fn fetch_latest(&self, channel: Channel) -> Result<ReleaseLookup, FetchError> {
        match channel {
            Channel::Release => {
                let url = format!("{}/repos/{}/releases/latest", self.api_base, self.repo);
                let record: ReleaseRecord = self.get_json(&url).await?;
                Ok(ReleaseLookup::Found(VersionTag::new(record.tag_name)))
            }
            Channel::Snapshot => {
                let url = format!(
                    "{}/repos/{}/releases?per_page={}",
                    self.api_base, self.repo, RECENT_RELEASES
                );
                let records: Vec<ReleaseRecord> = self.get_json(&url).await?;
                Ok(match select_prerelease(&records) {
                    Some(record) => ReleaseLookup::Found(VersionTag::new(&record.tag_name)),
                    None => ReleaseLookup::NoPrereleaseFound,
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = (|| async { self.get_once(url).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(250))
                    .with_max_delay(Duration::from_secs(2))
                    .with_max_times(2),
            )
            .when(FetchError::is_transient)
            .notify(|err: &FetchError, dur: Duration| {
                warn!(error = %err, retry_in = ?dur, "release request failed, retrying");
            })
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            return Err(FetchError::RateLimited);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }
        Ok(body)
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
