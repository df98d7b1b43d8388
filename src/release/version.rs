use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::VersionTag;

static BUNDLE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<key>CFBundleVersion</key>\s*<string>\s*([^<]+?)\s*</string>")
        .expect("bundle version regex must compile")
});

#[derive(Debug, Error)]
pub enum InstalledVersionError {
    #[error("{} not found", .0.display())]
    AppNotFound(PathBuf),

    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} has no CFBundleVersion", .0.display())]
    MissingBundleVersion(PathBuf),
}

pub fn info_plist_path(app_path: &Path) -> PathBuf {
    app_path.join("Contents").join("Info.plist")
}

/// `CFBundleVersion` of the application bundle at `app_path`. Only XML
/// property lists are understood.
pub fn read_installed_version(app_path: &Path) -> Result<VersionTag, InstalledVersionError> {
    if !app_path.exists() {
        return Err(InstalledVersionError::AppNotFound(app_path.to_path_buf()));
    }
    let plist = info_plist_path(app_path);
    let content = std::fs::read_to_string(&plist).map_err(|source| InstalledVersionError::Read {
        path: plist.clone(),
        source,
    })?;
    parse_bundle_version(&content)
        .map(VersionTag::new)
        .ok_or(InstalledVersionError::MissingBundleVersion(plist))
}

pub fn parse_bundle_version(plist: &str) -> Option<&str> {
    BUNDLE_VERSION_RE
        .captures(plist)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
