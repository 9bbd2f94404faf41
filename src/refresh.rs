//! Coalesced recomputation of the compatibility report.
//!
//! Every request supersedes the previous one: the in-flight task is aborted,
//! and a task whose version is no longer current never publishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use indicatif::ProgressBar;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::compat::{analyze, CompatibilityReport};
use crate::config::{CheckConfig, RemoteConfig, WatchConfig};
use crate::models::ProjectSnapshot;
use crate::registry::{apply_remote_info, fetch_remote_info, MetadataClient};
use crate::workspace::WorkspaceScanner;

/// Why a refresh was requested; decides how long to wait for follow-up events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// Modules or build files changed.
    Structure,
    /// License file contents changed.
    Query,
    Immediate,
}

pub trait SnapshotSource: Send + Sync + 'static {
    fn load(&self) -> BoxFuture<'_, Result<ProjectSnapshot>>;
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub version: u64,
    pub snapshot: Arc<ProjectSnapshot>,
    pub report: Arc<CompatibilityReport>,
}

pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn SnapshotSource>,
    structure_debounce: Duration,
    query_debounce: Duration,
    version: AtomicU64,
    /// Held while bumping the version and while publishing, so the two never interleave.
    in_flight: Mutex<Option<JoinHandle<()>>>,
    outcome_tx: watch::Sender<Option<AnalysisOutcome>>,
    busy_tx: watch::Sender<bool>,
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn SnapshotSource>, config: &WatchConfig) -> Self {
        let (outcome_tx, _) = watch::channel(None);
        let (busy_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                source,
                structure_debounce: Duration::from_millis(config.structure_debounce_ms),
                query_debounce: Duration::from_millis(config.query_debounce_ms),
                version: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                outcome_tx,
                busy_tx,
            }),
        }
    }

    /// Schedule a refresh, cancelling any pending or running one. Returns its version.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request(&self, trigger: RefreshTrigger) -> u64 {
        let delay = match trigger {
            RefreshTrigger::Structure => self.inner.structure_debounce,
            RefreshTrigger::Query => self.inner.query_debounce,
            RefreshTrigger::Immediate => Duration::ZERO,
        };

        let mut slot = self.inner.lock_in_flight();
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.busy_tx.send_replace(true);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.run(version, delay).await });
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        debug!(version, ?trigger, "refresh requested");
        version
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AnalysisOutcome>> {
        self.inner.outcome_tx.subscribe()
    }

    #[must_use]
    pub fn busy(&self) -> watch::Receiver<bool> {
        self.inner.busy_tx.subscribe()
    }

}

impl Drop for RefreshCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.lock_in_flight().take() {
            handle.abort();
        }
    }
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, version: u64) -> bool {
        self.version.load(Ordering::SeqCst) == version
    }

    async fn run(&self, version: u64, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.is_current(version) {
            return;
        }

        let snapshot = match self.source.load().await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!(version, error = %e, "refresh failed to load project");
                self.publish(version, None);
                return;
            }
        };

        let input = Arc::clone(&snapshot);
        let outcome = match tokio::task::spawn_blocking(move || analyze(&input)).await {
            Ok(report) => Some(AnalysisOutcome {
                version,
                snapshot,
                report: Arc::new(report),
            }),
            Err(e) => {
                warn!(version, error = %e, "compatibility analysis did not complete");
                None
            }
        };
        self.publish(version, outcome);
    }

    fn publish(&self, version: u64, outcome: Option<AnalysisOutcome>) {
        let _guard = self.lock_in_flight();
        if !self.is_current(version) {
            debug!(version, "discarding stale refresh result");
            return;
        }
        if let Some(outcome) = outcome {
            self.outcome_tx.send_replace(Some(outcome));
        }
        self.busy_tx.send_replace(false);
    }
}

/// Loads snapshots from disk, optionally enriched with remote license metadata.
pub struct ProjectSource {
    scanner: Arc<WorkspaceScanner>,
    remote: Option<(Arc<dyn MetadataClient>, RemoteConfig)>,
    check: CheckConfig,
    progress: Option<ProgressBar>,
}

impl ProjectSource {
    pub fn new(scanner: WorkspaceScanner, check: CheckConfig) -> Self {
        Self {
            scanner: Arc::new(scanner),
            remote: None,
            check,
            progress: None,
        }
    }

    pub fn with_remote(mut self, client: Arc<dyn MetadataClient>, config: RemoteConfig) -> Self {
        self.remote = Some((client, config));
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn load_snapshot(&self) -> Result<ProjectSnapshot> {
        let scanner = Arc::clone(&self.scanner);
        let mut snapshot = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .context("workspace scan did not complete")?;

        if let Some((client, config)) = &self.remote {
            let coordinates: Vec<String> = snapshot
                .dependencies
                .iter()
                .filter(|d| d.is_installed())
                .map(|d| d.coordinate())
                .collect();
            if let Some(pb) = &self.progress {
                pb.set_length(coordinates.len() as u64);
            }
            let progress = self.progress.as_ref();
            let records = fetch_remote_info(client.as_ref(), &coordinates, config, progress).await;
            apply_remote_info(&mut snapshot.dependencies, &records, self.scanner.detection());
            if let Some(pb) = &self.progress {
                pb.finish_and_clear();
            }
        }

        snapshot.ignored_dependencies = self.check.ignored_identifiers();
        Ok(snapshot)
    }
}

impl SnapshotSource for ProjectSource {
    fn load(&self) -> BoxFuture<'_, Result<ProjectSnapshot>> {
        Box::pin(self.load_snapshot())
    }
}
