use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::expand_home;
use crate::release::github::{DEFAULT_API_BASE, DEFAULT_REPO};

fn default_repo() -> String {
    DEFAULT_REPO.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_shell() -> String {
    "/bin/zsh".to_string()
}

fn default_download_dir() -> String {
    "~/Downloads".to_string()
}

fn default_app_path() -> String {
    "/Applications/MCreator.app".to_string()
}

fn default_grace_delay_ms() -> u64 {
    2000
}

fn default_interval_secs() -> u64 {
    600
}

fn default_probe_host() -> String {
    "api.github.com".to_string()
}

fn default_probe_port() -> u16 {
    443
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// GitHub `owner/name` of the tracked application.
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Directory with `download.zsh` and `full_update.zsh` replacing the
    /// built-in scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts_dir: Option<String>,
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    /// Defaults to `download_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    #[serde(default = "default_app_path")]
    pub app_path: String,
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            api_base: default_api_base(),
            shell: default_shell(),
            scripts_dir: None,
            download_dir: default_download_dir(),
            log_dir: None,
            app_path: default_app_path(),
            grace_delay_ms: default_grace_delay_ms(),
            agent: AgentSettings::default(),
            connectivity: ConnectivitySettings::default(),
        }
    }
}

impl Settings {
    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.download_dir))
    }

    pub fn log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => PathBuf::from(expand_home(dir)),
            None => self.download_dir(),
        }
    }

    pub fn app_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.app_path))
    }

    pub fn scripts_dir(&self) -> Option<PathBuf> {
        self.scripts_dir.as_deref().map(|d| PathBuf::from(expand_home(d)))
    }

    pub fn shell(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.shell))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AgentSettings {
    /// The background-check preference.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

impl AgentSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConnectivitySettings {
    #[serde(default = "default_probe_host")]
    pub host: String,
    #[serde(default = "default_probe_port")]
    pub port: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            host: default_probe_host(),
            port: default_probe_port(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}
