use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "mupdater";

/// `<config dir>/mupdater/config.toml`, e.g.
/// `~/Library/Application Support/mupdater/config.toml` on macOS.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Where settings live. A file given on the command line must exist; the
/// default location may not exist yet, in which case defaults apply.
pub fn resolve_config(cli_file: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli_file {
        if path.is_file() {
            return Ok(path.canonicalize()?);
        }
        anyhow::bail!("Config file not found: {}", path.display());
    }

    default_config_path()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine the user configuration directory"))
}
