use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// UpdateMode / Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMode {
    /// Fetch the installer disk image without touching the installed app.
    DownloadOnly,
    /// Download and replace the installed app (needs an elevated credential).
    FullUpdate,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::DownloadOnly => "download-only",
            UpdateMode::FullUpdate => "full",
        }
    }

    pub fn requires_credential(&self) -> bool {
        matches!(self, UpdateMode::FullUpdate)
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Release,
    Snapshot,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Release => "release",
            Channel::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Succeeded,
    Failed,
    NoUpdateAvailable,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded | SessionState::Failed | SessionState::NoUpdateAvailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Succeeded => "succeeded",
            SessionState::Failed => "failed",
            SessionState::NoUpdateAvailable => "no update available",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UpdateFailure — why a session ended in Failed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateFailure {
    #[error("update process exited unexpectedly ({})", exit_label(.code))]
    UnexpectedExit { code: Option<i32> },

    #[error("update script reported an error: {line}")]
    ScriptReportedError { line: String },

    #[error("the credential was rejected")]
    CredentialRejected,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "terminated by signal".to_string(),
    }
}

impl UpdateFailure {
    /// True for every failure the script announced itself, including a
    /// rejected credential.
    pub fn is_script_reported(&self) -> bool {
        matches!(
            self,
            UpdateFailure::ScriptReportedError { .. } | UpdateFailure::CredentialRejected
        )
    }
}

// ---------------------------------------------------------------------------
// UpdateSession
// ---------------------------------------------------------------------------

/// One attempt to check, download or install an update.
///
/// Only the session controller mutates a session; everybody else observes
/// snapshots of it through a [`tokio::sync::watch`] receiver.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSession {
    pub id: u64,
    pub mode: UpdateMode,
    pub channel: Channel,
    pub state: SessionState,
    pub progress_percent: f64,
    /// Verbatim output of the update process, in arrival order.
    pub log: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub failure: Option<UpdateFailure>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UpdateSession {
    pub fn new(id: u64, mode: UpdateMode, channel: Channel) -> Self {
        Self {
            id,
            mode,
            channel,
            state: SessionState::Idle,
            progress_percent: 0.0,
            log: String::new(),
            log_path: None,
            error: None,
            failure: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Idle -> Running. Returns false if the session already left Idle.
    pub fn begin(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.state = SessionState::Running;
        self.progress_percent = 0.0;
        self.started_at = Some(Utc::now());
        true
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn append_log(&mut self, fragment: &str) {
        self.log.push_str(fragment);
    }

    /// Lines of the log in insertion order. The last line may still be
    /// incomplete while the session is running.
    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.lines()
    }

    /// Raise progress to `percent` (clamped to 0..=100). Lower values are
    /// ignored so progress never decreases. Returns true if progress moved.
    pub fn advance_progress(&mut self, percent: f64) -> bool {
        if !self.is_running() || !percent.is_finite() {
            return false;
        }
        let percent = percent.clamp(0.0, 100.0);
        if percent > self.progress_percent {
            self.progress_percent = percent;
            true
        } else {
            false
        }
    }

    /// Running -> Succeeded.
    pub fn succeed(&mut self) -> bool {
        self.finish(SessionState::Succeeded, None)
    }

    /// Running -> NoUpdateAvailable.
    pub fn no_update(&mut self) -> bool {
        self.finish(SessionState::NoUpdateAvailable, None)
    }

    /// Running -> Failed.
    pub fn fail(&mut self, failure: UpdateFailure) -> bool {
        self.finish(SessionState::Failed, Some(failure))
    }

    fn finish(&mut self, state: SessionState, failure: Option<UpdateFailure>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.state = state;
        self.error = failure.as_ref().map(|f| f.to_string());
        self.failure = failure;
        self.finished_at = Some(Utc::now());
        true
    }
}
