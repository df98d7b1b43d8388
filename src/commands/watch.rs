use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::connectivity::ConnectivityProbe;
use crate::release::check::{check_for_update, CheckOutcome};
use crate::release::FetchError;
use crate::runner::Channel;

/// What the background check last saw. Only changes are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    UpdateAvailable(String),
    UpToDate,
    AppMissing,
    CheckFailed,
    /// The release host is unreachable; checks are skipped.
    Offline,
}

impl WatchState {
    pub fn from_result(result: &Result<CheckOutcome, FetchError>) -> Self {
        match result {
            Ok(CheckOutcome::NewRelease { tag, .. }) => WatchState::UpdateAvailable(tag.to_string()),
            Ok(CheckOutcome::AppMissing) => WatchState::AppMissing,
            Ok(_) => WatchState::UpToDate,
            Err(_) => WatchState::CheckFailed,
        }
    }
}

/// Remembers the previous state and says whether a new one is worth
/// reporting.
#[derive(Debug, Default)]
pub struct StateTracker {
    last: Option<WatchState>,
}

impl StateTracker {
    pub fn observe(&mut self, state: WatchState) -> bool {
        if self.last.as_ref() == Some(&state) {
            return false;
        }
        self.last = Some(state);
        true
    }
}

/// How often reachability is re-probed while watching.
const CONNECTIVITY_POLL: Duration = Duration::from_secs(30);

/// Keep the latest reachability of the release host in a watch channel.
/// `None` until the first probe has answered.
pub fn spawn_connectivity_watch(
    probe: ConnectivityProbe,
    poll: Duration,
    stop: CancellationToken,
) -> (watch::Receiver<Option<bool>>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(None);
    let task = tokio::spawn(async move {
        probe
            .observe(poll, stop, move |online| {
                let _ = tx.send(Some(online));
            })
            .await;
    });
    (rx, task)
}

pub async fn run(config_file: Option<&Path>, interval: Option<Duration>) -> Result<()> {
    let (path, settings) = super::load(config_file)?;
    if !settings.agent.enabled {
        bail!(
            "Background checks are disabled. Enable them with `mupdater agent enable` (config: {})",
            path.display()
        );
    }
    let interval = interval.unwrap_or_else(|| settings.agent.interval());
    if interval.is_zero() {
        bail!("The check interval must be greater than zero");
    }

    let releases = super::releases(&settings)?;
    let app_path = settings.app_path();
    let mut tracker = StateTracker::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let probe = ConnectivityProbe::from_settings(&settings.connectivity);
    let target = probe.target();
    let stop = CancellationToken::new();
    let (online, observer) = spawn_connectivity_watch(probe, CONNECTIVITY_POLL, stop.clone());

    info!(
        interval = %humantime::format_duration(interval),
        repo = %releases.repo(),
        "watching for updates, press Ctrl+C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stopping background checks");
                stop.cancel();
                let _ = observer.await;
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        if *online.borrow() == Some(false) {
            if tracker.observe(WatchState::Offline) {
                warn!(%target, "offline, skipping update checks");
            }
            continue;
        }

        let result = check_for_update(&releases, Channel::Release, &app_path).await;
        let state = WatchState::from_result(&result);
        if !tracker.observe(state.clone()) {
            continue;
        }
        match state {
            WatchState::UpdateAvailable(ref tag) => {
                info!(%tag, "update available");
                if let Ok(outcome) = &result {
                    println!("{}", outcome);
                }
            }
            WatchState::UpToDate => info!("up to date"),
            WatchState::AppMissing => warn!(app = %app_path.display(), "MCreator.app not found"),
            WatchState::CheckFailed => {
                if let Err(e) = &result {
                    warn!(error = %e, "check failed");
                }
            }
            WatchState::Offline => {}
        }
    }
}
