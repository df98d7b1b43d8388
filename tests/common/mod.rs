#![allow(dead_code)]
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary home for one test: config file, fake app bundle, download
/// and script directories.
pub struct TestEnv {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        Self { dir, config_path }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn app_path(&self) -> PathBuf {
        self.path().join("MCreator.app")
    }

    pub fn download_dir(&self) -> PathBuf {
        self.path().join("Downloads")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.path().join("scripts")
    }

    /// Write a config pointing every path into this environment. `extra` is
    /// appended verbatim (top-level keys first, then tables).
    pub fn write_config(&self, extra: &str) {
        let config = format!(
            "app_path = {:?}\ndownload_dir = {:?}\n{}",
            self.app_path().display().to_string(),
            self.download_dir().display().to_string(),
            extra
        );
        std::fs::write(&self.config_path, config).unwrap();
    }

    pub fn install_app(&self, version: &str) {
        let contents = self.app_path().join("Contents");
        std::fs::create_dir_all(&contents).unwrap();
        std::fs::write(contents.join("Info.plist"), info_plist(version)).unwrap();
    }

    /// Use the same shell script body for both update modes.
    pub fn write_scripts(&self, body: &str) {
        let dir = self.scripts_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("download.zsh"), body).unwrap();
        std::fs::write(dir.join("full_update.zsh"), body).unwrap();
    }
}

pub fn info_plist(version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
	<key>CFBundleName</key>
	<string>MCreator</string>
	<key>CFBundleVersion</key>
	<string>{version}</string>
</dict>
</plist>
"#
    )
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn release_json(tag: &str, prerelease: bool) -> serde_json::Value {
    serde_json::json!({
        "tag_name": tag,
        "name": format!("MCreator {tag}"),
        "prerelease": prerelease,
        "draft": false,
        "assets": [
            {"browser_download_url": format!("https://example.invalid/MCreator {tag} Mac aarch64.dmg")}
        ]
    })
}
