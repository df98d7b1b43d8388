use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::model::ConnectivitySettings;

/// Reports whether the release host is reachable. Reachability is a TCP
/// connect to `host:port` that completes within `timeout`.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_settings(settings: &ConnectivitySettings) -> Self {
        Self::new(
            settings.host.clone(),
            settings.port,
            Duration::from_millis(settings.timeout_ms),
        )
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub async fn is_online(&self) -> bool {
        let target = self.target();
        match tokio::time::timeout(self.timeout, TcpStream::connect(&target)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(target = %target, error = %e, "connectivity probe failed");
                false
            }
            Err(_) => {
                debug!(target = %target, "connectivity probe timed out");
                false
            }
        }
    }

    /// Probe every `interval` until `cancel` fires. `on_change` is called with
    /// the first result and then only when the state flips.
    pub async fn observe<F>(&self, interval: Duration, cancel: CancellationToken, mut on_change: F)
    where
        F: FnMut(bool),
    {
        let mut last: Option<bool> = None;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let online = tokio::select! {
                _ = cancel.cancelled() => break,
                online = self.is_online() => online,
            };
            if last != Some(online) {
                info!(target = %self.target(), online, "connectivity changed");
                on_change(online);
                last = Some(online);
            }
        }
    }
}
