use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use super::session::{Channel, UpdateMode};

const DOWNLOAD_SCRIPT: &str = include_str!("../../scripts/download.zsh");
const FULL_UPDATE_SCRIPT: &str = include_str!("../../scripts/full_update.zsh");

/// File names looked up when scripts are loaded from a directory.
pub const DOWNLOAD_SCRIPT_FILE: &str = "download.zsh";
pub const FULL_UPDATE_SCRIPT_FILE: &str = "full_update.zsh";

/// `$0` of the script. Mode, channel and credential follow as `$1..$3`.
const SCRIPT_NAME_ARG: &str = "mupdater";

// ---------------------------------------------------------------------------
// ScriptCatalog
// ---------------------------------------------------------------------------

/// The script bodies the runner can execute: one for download-only runs and
/// one for full updates. Both receive the channel as an argument.
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    download_only: Cow<'static, str>,
    full_update: Cow<'static, str>,
}

impl Default for ScriptCatalog {
    fn default() -> Self {
        Self::embedded()
    }
}

impl ScriptCatalog {
    /// The scripts compiled into the binary.
    pub fn embedded() -> Self {
        Self {
            download_only: Cow::Borrowed(DOWNLOAD_SCRIPT),
            full_update: Cow::Borrowed(FULL_UPDATE_SCRIPT),
        }
    }

    pub fn from_sources(download_only: impl Into<String>, full_update: impl Into<String>) -> Self {
        Self {
            download_only: Cow::Owned(download_only.into()),
            full_update: Cow::Owned(full_update.into()),
        }
    }

    /// Load `download.zsh` and `full_update.zsh` from `dir`.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let download_only = std::fs::read_to_string(dir.join(DOWNLOAD_SCRIPT_FILE))?;
        let full_update = std::fs::read_to_string(dir.join(FULL_UPDATE_SCRIPT_FILE))?;
        Ok(Self::from_sources(download_only, full_update))
    }

    pub fn script_for(&self, mode: UpdateMode) -> &str {
        match mode {
            UpdateMode::DownloadOnly => &self.download_only,
            UpdateMode::FullUpdate => &self.full_update,
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateCommand
// ---------------------------------------------------------------------------

/// A fully built invocation of the update script for one of the four
/// mode/channel variants.
#[derive(Clone)]
pub struct UpdateCommand {
    pub mode: UpdateMode,
    pub channel: Channel,
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl UpdateCommand {
    /// `<shell> -c <script> mupdater <mode> <channel> [credential]`
    pub fn build(
        shell: &Path,
        scripts: &ScriptCatalog,
        mode: UpdateMode,
        channel: Channel,
        credential: Option<&str>,
        env: BTreeMap<String, String>,
    ) -> Self {
        let mut args = vec![
            "-c".to_string(),
            scripts.script_for(mode).to_string(),
            SCRIPT_NAME_ARG.to_string(),
            mode.as_str().to_string(),
            channel.as_str().to_string(),
        ];
        if mode.requires_credential() {
            args.push(credential.unwrap_or_default().to_string());
        }
        Self {
            mode,
            channel,
            program: shell.to_path_buf(),
            args,
            env,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Positional arguments passed after the script body.
    pub fn script_args(&self) -> &[String] {
        &self.args[2..]
    }

    /// A tokio command with stdin closed and both output streams piped.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        crate::platform::configure_process_group(&mut cmd);
        cmd
    }
}

// Never print the script body or the credential.
impl fmt::Debug for UpdateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateCommand")
            .field("mode", &self.mode)
            .field("channel", &self.channel)
            .field("program", &self.program)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
