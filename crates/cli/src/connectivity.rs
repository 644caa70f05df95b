//! Reachability probe feeding `ConnectivityChanged` intents.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ConnectivityConfig;

/// Periodic TCP reachability check against the inference host.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    host: String,
    port: u16,
    interval: Duration,
    timeout: Duration,
}

impl ConnectivityProbe {
    /// Derives the probe target from the endpoint URL.
    pub fn from_endpoint(endpoint: &str, config: &ConnectivityConfig) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(endpoint)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("endpoint has no host: {endpoint}"))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow::anyhow!("endpoint has no port: {endpoint}"))?;
        Ok(Self {
            host,
            port,
            interval: Duration::from_secs(config.probe_interval_secs.max(1)),
            timeout: Duration::from_millis(config.probe_timeout_ms),
        })
    }

    pub fn target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// Attempts one connection; `true` if it succeeds within the timeout.
    pub async fn probe_once(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = %self.host, port = self.port, error = %e, "Probe failed");
                false
            }
            Err(_) => {
                debug!(host = %self.host, port = self.port, "Probe timed out");
                false
            }
        }
    }

    /// Starts probing in the background. The channel starts optimistic and
    /// only publishes changes.
    pub fn spawn(self) -> (watch::Receiver<bool>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(true);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                let online = self.probe_once().await;
                let changed = tx.send_if_modified(|current| {
                    let changed = *current != online;
                    *current = online;
                    changed
                });
                if changed {
                    info!(online, host = %self.host, "Reachability changed");
                }
                if tx.is_closed() {
                    break;
                }
            }
        });
        (rx, handle)
    }
}
