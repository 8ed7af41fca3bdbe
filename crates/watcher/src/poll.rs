//! Per-target polling loop
//!
//! Each cycle goes `Idle -> Scanning -> (NoChange | Detected) -> Idle`, then
//! sleeps a fixed interval. Cancellation is only observed between cycles, so
//! a cycle that has started always runs to completion.
//!
//! At most one blocking scan per target is in flight. A scan that outlives
//! the scan timeout is picked up again by the next cycle instead of being
//! started a second time.

use crate::detect::{ChangeDetector, Decision};
use crate::scan::{Candidate, Scan, ScanError, Scanner};
use camwatch_core::{Detection, MediaKind, SelectionPolicy, Sink, WatchTarget};
use camwatch_journal::{LastSeen, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a single polling cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoChange,
    Detected(Detection),
    /// Scan failed; logged and retried next cycle
    ScanFailed,
}

type ScanTask = JoinHandle<Result<Option<Candidate>, ScanError>>;

/// Polling loop for one watch target
pub struct PollLoop {
    scanner: Arc<dyn Scan>,
    pending_scan: Mutex<Option<ScanTask>>,
    detector: ChangeDetector,
    store: Arc<StateStore>,
    sinks: Vec<Arc<dyn Sink>>,
    interval: Duration,
    scan_timeout: Option<Duration>,
}

impl PollLoop {
    pub fn new(
        target: WatchTarget,
        camera_name: &str,
        policy: SelectionPolicy,
        store: Arc<StateStore>,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Self {
        let scanner = Arc::new(Scanner::new(target, policy));
        Self::with_scanner(scanner, camera_name, policy, store, sinks)
    }

    /// Poll loop over a custom candidate source
    pub fn with_scanner(
        scanner: Arc<dyn Scan>,
        camera_name: &str,
        policy: SelectionPolicy,
        store: Arc<StateStore>,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Self {
        let detector = ChangeDetector::new(camera_name, scanner.target().kind, policy);
        Self {
            scanner,
            pending_scan: Mutex::new(None),
            detector,
            store,
            sinks,
            interval: Duration::from_secs(1),
            scan_timeout: None,
        }
    }

    /// Delay between cycles (default: 1 second)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Give up on a scan that takes longer than `timeout`
    pub fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn kind(&self) -> MediaKind {
        self.scanner.target().kind
    }

    /// Run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            "Starting {} polling of {} (interval: {:?})",
            self.kind(),
            self.scanner.target(),
            self.interval
        );

        loop {
            self.poll_once().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Stopped {} polling", self.kind());
    }

    /// Run one scan-detect-publish cycle
    pub async fn poll_once(&self) -> CycleOutcome {
        let kind = self.kind();

        let candidate = match self.scan().await {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                debug!("No {} candidates yet", kind);
                return CycleOutcome::NoChange;
            }
            Err(e) => {
                warn!("{} scan failed: {}", kind, e);
                return CycleOutcome::ScanFailed;
            }
        };

        let previous = self.store.get(kind);
        let notification = match self.detector.evaluate(&candidate, previous.as_ref()) {
            Decision::Detected(notification) => notification,
            Decision::Unchanged(reason) => {
                debug!("{} unchanged ({:?}): {}", kind, reason, candidate.path.display());
                return CycleOutcome::NoChange;
            }
        };

        info!("New {} detected: {}", kind, candidate.path.display());

        let detection = Detection {
            kind,
            path: candidate.path.clone(),
            notification,
        };

        for sink in &self.sinks {
            if let Err(e) = sink.publish(&detection).await {
                warn!("{} sink failed for {}: {:#}", sink.name(), detection.path.display(), e);
            }
        }

        // Recorded even when a sink failed: deliveries are never rolled back
        let entry = LastSeen::new(candidate.path, candidate.modified, detection.notification.clone());
        if let Err(e) = self.store.record(kind, entry) {
            warn!("Failed to persist {} state: {}", kind, e);
        }

        CycleOutcome::Detected(detection)
    }

    async fn scan(&self) -> Result<Option<Candidate>, ScanError> {
        let mut pending = self.pending_scan.lock().await;

        let mut task = match pending.take() {
            Some(task) => {
                debug!("Waiting on previous {} scan", self.kind());
                task
            }
            None => {
                let scanner = Arc::clone(&self.scanner);
                tokio::task::spawn_blocking(move || scanner.scan())
            }
        };

        let joined = match self.scan_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    *pending = Some(task);
                    return Err(ScanError::TimedOut {
                        root: self.scanner.target().root.clone(),
                        timeout,
                    });
                }
            },
            None => task.await,
        };

        joined?
    }
}
