pub mod model;
pub mod resolve;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use model::Settings;

/// Read settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Settings::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read config file {}", path.display()))
        }
    };
    let settings: Settings = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e))?;

    if let Err(errors) = validate::validate(&settings) {
        let list = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");
        anyhow::bail!("Invalid config file {}:\n{}", path.display(), list);
    }
    Ok(settings)
}

/// Write settings atomically: serialize to a sibling `.tmp` file, then
/// rename over the target.
pub fn save_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(settings).context("serializing settings")?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
    Ok(())
}
