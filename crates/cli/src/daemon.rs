//! Daemon lifecycle management
//!
//! Builds one poll loop per watch target, runs them as independent tasks and
//! winds them down cooperatively on SIGINT/SIGTERM.

use anyhow::{Context, Result};
use camwatch_core::{Config, Sink};
use camwatch_journal::StateStore;
use camwatch_relay::{CopySink, WebhookClient, WebhookSink};
use camwatch_watcher::PollLoop;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A configured, not yet running daemon
pub struct Daemon {
    config: Config,
    store: Arc<StateStore>,
    sinks: Vec<Arc<dyn Sink>>,
}

impl Daemon {
    /// Wire up state and sinks from a validated config
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(StateStore::open(&config.state.dir));

        let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

        // Copy first so the local file is in place by the time the webhook fires
        if let Some(copy) = CopySink::from_config(&config.copy) {
            info!("Copying latest files to {}", copy.destination().display());
            sinks.push(Arc::new(copy));
        }

        let client = WebhookClient::from_config(config.webhook_url(), &config.webhook)
            .context("Failed to set up webhook delivery")?;
        match client.endpoint() {
            Some(url) => info!("Delivering notifications to {}", url),
            None => info!("No webhook URL configured, delivery disabled"),
        }
        sinks.push(Arc::new(WebhookSink::new(Arc::new(client))));

        Ok(Self {
            config,
            store,
            sinks,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// One loop per configured target
    pub fn poll_loops(&self) -> Vec<PollLoop> {
        self.config
            .watch
            .targets
            .iter()
            .map(|target| {
                PollLoop::new(
                    target.clone(),
                    &self.config.camera.name,
                    self.config.watch.policy,
                    Arc::clone(&self.store),
                    self.sinks.clone(),
                )
                .with_interval(self.config.interval())
                .with_scan_timeout(self.config.scan_timeout())
            })
            .collect()
    }

    /// Run until a termination signal arrives
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` resolves, then let in-flight cycles finish
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(
            "Starting monitoring for camera '{}' ({:?} policy)",
            self.config.camera.name, self.config.watch.policy
        );

        let cancel = CancellationToken::new();
        let handles: Vec<_> = self
            .poll_loops()
            .into_iter()
            .map(|poll| tokio::spawn(poll.run(cancel.clone())))
            .collect();

        shutdown.await;
        info!("Shutting down, waiting for in-flight cycles");
        cancel.cancel();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                warn!("Poll task ended abnormally: {}", e);
            }
        }

        info!("Daemon stopped");
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
