use std::sync::LazyLock;

use regex::Regex;

use super::session::{Channel, UpdateFailure, UpdateMode};

// ---------------------------------------------------------------------------
// Output markers emitted by the update scripts. These strings are a contract
// with the scripts and must not change.
// ---------------------------------------------------------------------------

pub const FETCHING: &str = "Fetching the latest";
pub const LOCATING: &str = "Locating the download resource for";
pub const DETACHING_PREVIOUS: &str = "Detaching previously mounted";
pub const MOUNTING: &str = "Mounting the disk image";
pub const VERIFIED: &str = "verified";
pub const MOVING_OLD: &str = "Moving the old version";
pub const COPYING_NEW: &str = "Copying the new version";
pub const DETACHING_MOUNTED: &str = "Detaching the mounted volume";
pub const DELETING_IMAGE: &str = "Deleting the disk image";
pub const FINISHING_UP: &str = "Finishing Up";
pub const NO_PRERELEASES: &str = "No prereleases";
pub const ERROR_OCCURRED: &str = "An error occurred";
pub const CHECKSUMMING: &str = "Checksumming";
pub const CRC32: &str = "CRC32";
pub const SUDO_RETRY: &str = "Sorry, try again";
pub const SUDO_INCORRECT: &str = "incorrect password";

// ---------------------------------------------------------------------------
// PercentWindow — the slice of the bar a phase owns for numeric progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentWindow {
    pub start: f64,
    pub end: f64,
}

impl PercentWindow {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Linearly map a reported 0..=100 value into this window. Non-decreasing
    /// in `reported`, so later, larger reports never map below earlier ones.
    pub fn remap(&self, reported: u8) -> f64 {
        let reported = f64::from(reported.min(100));
        self.start + (reported / 100.0) * (self.end - self.start)
    }
}

/// Download phase of a full update: after detaching old volumes (15) and
/// before mounting the new image (75).
pub const FULL_DOWNLOAD_WINDOW: PercentWindow = PercentWindow::new(15.0, 75.0);

/// Download-only runs spend the rest of the bar downloading.
pub const DOWNLOAD_ONLY_WINDOW: PercentWindow = PercentWindow::new(10.0, 100.0);

// ---------------------------------------------------------------------------
// Effect / ProgressRule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A named phase boundary. Sets progress to `percent` and makes `window`
    /// the target of numeric progress reports until the next checkpoint.
    Checkpoint {
        percent: f64,
        window: Option<PercentWindow>,
    },
    /// The script finished its work. Progress jumps to `percent` when given.
    Succeed { percent: Option<f64> },
    /// The script found nothing to install.
    NothingToDo,
    /// The script announced a failure.
    Fail(FailureKind),
    /// Numbers in this fragment are not progress reports.
    SuppressPercent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ScriptError,
    CredentialRejected,
}

impl FailureKind {
    /// Build the failure for a fragment that matched `marker`, quoting the
    /// line that carried the marker.
    pub fn into_failure(self, fragment: &str, marker: &str) -> UpdateFailure {
        match self {
            FailureKind::CredentialRejected => UpdateFailure::CredentialRejected,
            FailureKind::ScriptError => UpdateFailure::ScriptReportedError {
                line: line_containing(fragment, marker).to_string(),
            },
        }
    }
}

fn line_containing<'a>(fragment: &'a str, marker: &str) -> &'a str {
    fragment
        .lines()
        .find(|l| l.contains(marker))
        .unwrap_or(fragment)
        .trim()
}

/// A trigger/effect pair. The rule fires when a fragment contains any of its
/// markers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRule {
    pub markers: &'static [&'static str],
    pub effect: Effect,
}

impl ProgressRule {
    const fn new(markers: &'static [&'static str], effect: Effect) -> Self {
        Self { markers, effect }
    }

    /// The first of this rule's markers present in `fragment`.
    pub fn matched_marker(&self, fragment: &str) -> Option<&'static str> {
        self.markers.iter().copied().find(|m| fragment.contains(m))
    }
}

const fn checkpoint(
    markers: &'static [&'static str],
    percent: f64,
    window: Option<PercentWindow>,
) -> ProgressRule {
    ProgressRule::new(markers, Effect::Checkpoint { percent, window })
}

// ---------------------------------------------------------------------------
// PercentExtractor — the numeric fallback
// ---------------------------------------------------------------------------

/// A standalone 1-3 digit number, optionally followed by `%`. Digits glued to
/// dots, letters or underscores (versions like `2024.3.1`, `x86_64`) do not
/// count.
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\d{1,3})%?(?:\s|$)").expect("percent regex must compile")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct PercentExtractor;

impl PercentExtractor {
    /// First standalone value in 0..=100 found in `text`.
    pub fn extract(&self, text: &str) -> Option<u8> {
        let caps = PERCENT_RE.captures(text)?;
        let value: u16 = caps.get(1)?.as_str().parse().ok()?;
        (value <= 100).then_some(value as u8)
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Ordered rules for one mode/channel combination. Rules are tried in order
/// and the first match wins; fragments no rule claims fall through to the
/// percentage extractor.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ProgressRule>,
    extractor: PercentExtractor,
}

impl RuleSet {
    pub fn new(rules: Vec<ProgressRule>) -> Self {
        Self {
            rules,
            extractor: PercentExtractor,
        }
    }

    pub fn for_variant(mode: UpdateMode, channel: Channel) -> Self {
        let mut rules = match mode {
            UpdateMode::DownloadOnly => vec![
                checkpoint(&[FETCHING], 5.0, None),
                checkpoint(&[LOCATING], 10.0, Some(DOWNLOAD_ONLY_WINDOW)),
                ProgressRule::new(&[FINISHING_UP], Effect::Succeed { percent: None }),
            ],
            UpdateMode::FullUpdate => vec![
                checkpoint(&[FETCHING], 5.0, None),
                checkpoint(&[LOCATING], 10.0, Some(FULL_DOWNLOAD_WINDOW)),
                checkpoint(&[DETACHING_PREVIOUS], 15.0, Some(FULL_DOWNLOAD_WINDOW)),
                checkpoint(&[MOUNTING], 75.0, None),
                checkpoint(&[VERIFIED], 77.5, None),
                checkpoint(&[MOVING_OLD], 80.0, None),
                checkpoint(&[COPYING_NEW], 85.0, None),
                checkpoint(&[DETACHING_MOUNTED], 90.0, None),
                ProgressRule::new(
                    &[DELETING_IMAGE],
                    Effect::Succeed {
                        percent: Some(100.0),
                    },
                ),
            ],
        };

        if channel == Channel::Snapshot {
            rules.push(ProgressRule::new(&[NO_PRERELEASES], Effect::NothingToDo));
        }

        rules.push(ProgressRule::new(
            &[SUDO_RETRY, SUDO_INCORRECT],
            Effect::Fail(FailureKind::CredentialRejected),
        ));
        rules.push(ProgressRule::new(
            &[ERROR_OCCURRED],
            Effect::Fail(FailureKind::ScriptError),
        ));
        // hdiutil's checksum lines are full of numbers that are not progress.
        rules.push(ProgressRule::new(
            &[CHECKSUMMING, CRC32],
            Effect::SuppressPercent,
        ));

        Self::new(rules)
    }

    /// The effect of the first rule with a marker in `text`.
    pub fn find_rule(&self, text: &str) -> Option<(&Effect, &'static str)> {
        self.rules
            .iter()
            .find_map(|rule| rule.matched_marker(text).map(|m| (&rule.effect, m)))
    }

    /// The numeric fallback alone.
    pub fn reported_percent(&self, text: &str) -> Option<u8> {
        self.extractor.extract(text)
    }
}
