use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use regex::Regex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::runner::rules;

// ---------------------------------------------------------------------------
// LineTone — how a line of script output is highlighted on a terminal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTone {
    Plain,
    /// A phase announcement from the script.
    Phase,
    Success,
    Error,
}

static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(error|failed|sorry, try again|incorrect password)\b")
        .expect("error regex must compile")
});

const PHASE_MARKERS: &[&str] = &[
    rules::FETCHING,
    rules::LOCATING,
    rules::DETACHING_PREVIOUS,
    rules::MOUNTING,
    rules::MOVING_OLD,
    rules::COPYING_NEW,
    rules::DETACHING_MOUNTED,
];

const SUCCESS_MARKERS: &[&str] = &[rules::FINISHING_UP, rules::DELETING_IMAGE];

/// Pick a tone for one line of output.
pub fn detect_tone(line: &str) -> LineTone {
    if ERROR_RE.is_match(line) {
        LineTone::Error
    } else if SUCCESS_MARKERS.iter().any(|m| line.contains(m)) {
        LineTone::Success
    } else if PHASE_MARKERS.iter().any(|m| line.contains(m)) {
        LineTone::Phase
    } else {
        LineTone::Plain
    }
}

pub fn paint_line(line: &str, use_color: bool) -> String {
    if !use_color {
        return line.to_string();
    }
    match detect_tone(line) {
        LineTone::Plain => line.to_string(),
        LineTone::Phase => format!("{}", line.bold()),
        LineTone::Success => format!("{}", line.green()),
        LineTone::Error => format!("{}", line.red()),
    }
}

// ---------------------------------------------------------------------------
// SessionLogFile — verbatim copy of a session's output on disk
// ---------------------------------------------------------------------------

/// `updater_log_<YYYYmmddHHMMSS>.log`, or `updater_log_<YYYYmmddHHMMSS>-<n>.log`
/// for the `n`th session started within the same second.
pub fn log_file_name(at: DateTime<Local>, n: u32) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    match n {
        0 | 1 => format!("updater_log_{}.log", stamp),
        n => format!("updater_log_{}-{}.log", stamp, n),
    }
}

const MAX_NAME_ATTEMPTS: u32 = 100;

pub struct SessionLogFile {
    path: PathBuf,
    file: File,
}

impl SessionLogFile {
    /// Create a fresh log file for a session started at `at`. An existing
    /// file is never reused; a numeric suffix is added instead.
    pub async fn create(dir: &Path, at: DateTime<Local>) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let mut n = 1;
        loop {
            let path = dir.join(log_file_name(at, n));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok(Self { path, file }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists && n < MAX_NAME_ATTEMPTS => n += 1,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&mut self, fragment: &str) -> std::io::Result<()> {
        self.file.write_all(fragment.as_bytes()).await
    }

    pub async fn close(mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }
}
