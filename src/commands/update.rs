use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use tracing::{info, warn};

use crate::config::model::Settings;
use crate::connectivity::ConnectivityProbe;
use crate::runner::{Channel, RunnerSettings, SessionState, UpdateMode, UpdateRunner};
use crate::ui::progress::{follow, ProgressRenderer};
use crate::ui::{prompt, summary};

pub struct UpdateOptions {
    pub channel: Channel,
    pub mode: Option<UpdateMode>,
    pub check_first: bool,
    pub password_stdin: bool,
}

/// Environment the update scripts read their targets from.
pub fn script_env(settings: &Settings) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("MUPDATER_REPO".to_string(), settings.repo.clone()),
        ("MUPDATER_API_BASE".to_string(), settings.api_base.clone()),
        (
            "MUPDATER_DOWNLOAD_DIR".to_string(),
            settings.download_dir().display().to_string(),
        ),
        (
            "MUPDATER_APP_PATH".to_string(),
            settings.app_path().display().to_string(),
        ),
    ])
}

pub fn runner_settings(settings: &Settings) -> Result<RunnerSettings> {
    let mut runner = RunnerSettings {
        shell: settings.shell(),
        grace_delay: settings.grace_delay(),
        log_dir: Some(settings.log_dir()),
        env: script_env(settings),
        ..RunnerSettings::default()
    };
    if let Some(dir) = settings.scripts_dir() {
        runner = runner
            .with_scripts_dir(&dir)
            .with_context(|| format!("loading update scripts from {}", dir.display()))?;
    }
    Ok(runner)
}

fn choose_mode(opts: &UpdateOptions) -> Result<UpdateMode> {
    if let Some(mode) = opts.mode {
        return Ok(mode);
    }
    if opts.password_stdin || !std::io::stdin().is_terminal() {
        bail!("--mode is required when stdin is not interactive");
    }
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    prompt::prompt_mode(&mut stdin.lock(), &mut stdout)?
        .context("no update mode chosen")
}

pub async fn run(config_file: Option<&Path>, opts: UpdateOptions) -> Result<()> {
    let (_, settings) = super::load(config_file)?;

    let probe = ConnectivityProbe::from_settings(&settings.connectivity);
    if !probe.is_online().await {
        bail!(
            "No internet connection ({} is unreachable). Connect and try again.",
            probe.target()
        );
    }

    let mode = choose_mode(&opts)?;
    let credential = if mode.requires_credential() {
        Some(prompt::read_credential(opts.password_stdin).context("reading password")?)
    } else {
        None
    };

    let mut runner = UpdateRunner::new(runner_settings(&settings)?);

    let handle = if opts.check_first {
        let releases = super::releases(&settings)?;
        let lookup = releases
            .fetch_latest(opts.channel)
            .await
            .context("Could not check for updates, nothing was started")?;
        info!(?lookup, "release feed answered");
        runner.start_after_check(mode, opts.channel, credential.as_deref(), &lookup)?
    } else {
        runner.start(mode, opts.channel, credential.as_deref())?
    };
    drop(credential);

    let ctrl_c = {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping the update");
                handle.cancel();
            }
        })
    };

    let title = match opts.channel {
        Channel::Release => mode.to_string(),
        Channel::Snapshot => format!("{} (snapshot)", mode),
    };
    let session = follow(&handle, ProgressRenderer::new(&title)).await;
    ctrl_c.abort();

    summary::print_outcome(&session);
    if session.state == SessionState::Failed {
        bail!("update failed");
    }
    Ok(())
}
