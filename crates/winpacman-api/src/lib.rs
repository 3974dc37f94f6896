//! Core API surface for the GUI (spec §4.9, C10).
//!
//! A thin façade composing the cache (C5), sync orchestrator (C6),
//! manager resolver (C7), and install/uninstall engine (C8) behind the
//! handful of calls the presentation layer actually needs. Shaped after
//! `vx_cli::registry::create_registry` + `vx_runtime::context::
//! RuntimeContext`: explicit collaborators constructed once and held
//! behind one facade object, no global state, every call cheap to
//! invoke from any thread (spec §9 "Cache coherence").
//!
//! Every call here is async and returns quickly; the three operations
//! that run for a while (`refresh`, `refresh_installed`, `install`/
//! `uninstall`) hand back a cancellable stream instead of blocking the
//! caller until completion (spec §4.9 "all calls non-blocking").

mod error;
mod progress;
mod rescan;

use std::collections::HashMap;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use winpacman_cache::MetadataCache;
use winpacman_engine::{InstallUninstallEngine, OperationRequest};
use winpacman_model::{Freshness, Manager, PackageRecord};
use winpacman_provider::ProviderRegistry;
use winpacman_resolver::{ManagerResolver, ResolverPaths};
use winpacman_state::HistoryStore;
use winpacman_sync::{ProgressStream, RefreshConcurrency, SyncOrchestrator};

pub use error::{ApiError, Result};
pub use progress::{InstalledScanEvent, OperationStreamError, OperationStreamEvent};
pub use rescan::InstalledScanPaths;
pub use winpacman_engine::{EnginePhase, OperationProgressEvent, OperationResult};
pub use winpacman_sync::SyncPhase;

/// A cancellable sequence of installed-inventory scan events.
pub type InstalledScanStream = Pin<Box<dyn Stream<Item = InstalledScanEvent> + Send>>;
/// A cancellable sequence of install/uninstall progress and result events.
pub type OperationStream = Pin<Box<dyn Stream<Item = OperationStreamEvent> + Send>>;

/// Everything the façade needs beyond what the cache/orchestrator
/// already carry: where to find Scoop's installed-apps directory for
/// `refresh_installed`, and the Winget/Chocolatey evidence paths the
/// resolver cross-validates fingerprints against (spec §4.6 step 3).
#[derive(Debug, Clone)]
pub struct FacadePaths {
    pub scoop_apps_dir: std::path::PathBuf,
    pub winget_installed_db: std::path::PathBuf,
    pub chocolatey_lib_dir: std::path::PathBuf,
}

/// The façade (spec §4.9, C10). Cheap to clone: every clone shares the
/// same cache handle, orchestrator, resolver, and engine.
#[derive(Clone)]
pub struct WinpacmanApi {
    cache: MetadataCache,
    providers: ProviderRegistry,
    orchestrator: SyncOrchestrator,
    resolver: Arc<ManagerResolver>,
    engine: Arc<InstallUninstallEngine>,
    scan_paths: rescan::InstalledScanPaths,
    op_cancel: Arc<Mutex<HashMap<(Manager, String), CancellationToken>>>,
}

impl WinpacmanApi {
    pub fn new(cache: MetadataCache, providers: ProviderRegistry, history: HistoryStore, paths: FacadePaths) -> Self {
        let orchestrator = SyncOrchestrator::new(cache.clone(), providers.clone());
        let resolver = Arc::new(ManagerResolver::new(
            cache.clone(),
            ResolverPaths { installed_db: paths.winget_installed_db, chocolatey_lib_dir: paths.chocolatey_lib_dir },
        ));
        let scan_paths = rescan::InstalledScanPaths { scoop_apps_dir: paths.scoop_apps_dir };
        let rescan_trigger = Arc::new(rescan::RescanTrigger {
            cache: cache.clone(),
            resolver: Arc::clone(&resolver),
            paths: scan_paths.clone(),
        });
        let engine = Arc::new(InstallUninstallEngine::new(history).with_rescan_trigger(rescan_trigger));

        Self { cache, providers, orchestrator, resolver, engine, scan_paths, op_cancel: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Full-text search of the cache (spec §4.9 `search`).
    pub async fn search(&self, query: &str, managers: Option<Vec<Manager>>, limit: Option<u32>) -> Result<Vec<PackageRecord>> {
        Ok(self.cache.search(query, managers, limit.unwrap_or(100)).await?)
    }

    /// Everything in the cache, optionally filtered by manager (spec
    /// §4.9 `list_available`: "pulls from cache, not from the
    /// provider").
    pub async fn list_available(&self, manager_filter: Option<Vec<Manager>>) -> Result<Vec<PackageRecord>> {
        Ok(self.cache.list(manager_filter).await?)
    }

    /// Every currently-installed record, optionally filtered (spec §4.9
    /// `list_installed`).
    pub async fn list_installed(&self, manager_filter: Option<Vec<Manager>>) -> Result<Vec<PackageRecord>> {
        Ok(self.cache.get_installed(manager_filter, None).await?)
    }

    /// Refresh one provider's catalog, or every provider if `manager`
    /// is `None` (spec §4.9 `refresh`). `force=false` lets the
    /// orchestrator's own freshness policy decide whether anything
    /// needs to happen at all.
    pub async fn refresh(&self, manager: Option<Manager>, force: bool) -> Result<ProgressStream> {
        match manager {
            Some(manager) => Ok(self.orchestrator.refresh_one(manager, force).await?),
            None => Ok(self.orchestrator.refresh_all(force, RefreshConcurrency::Parallel(2)).await?),
        }
    }

    /// Cooperatively cancel an in-flight catalog refresh for `manager`.
    pub fn cancel_refresh(&self, manager: Manager) {
        self.orchestrator.cancel(manager);
    }

    /// Rescan the Registry + Scoop installed inventory, resolve
    /// attribution, and merge the result into the cache (spec §4.9
    /// `refresh_installed`: "registry + scoop inventory, then resolver,
    /// then merge"). Runs on a background task; progress arrives on the
    /// returned stream and dropping it does not stop the scan — use
    /// [`WinpacmanApi::cancel_refresh_installed`] for that.
    pub fn refresh_installed(&self) -> InstalledScanStream {
        let (tx, rx) = mpsc::channel(16);
        let cache = self.cache.clone();
        let resolver = Arc::clone(&self.resolver);
        let scan_paths = self.scan_paths.clone();
        let cancel = CancellationToken::new();
        let cancel_for_task = cancel.clone();

        {
            let mut guard = self.op_cancel.lock().unwrap();
            guard.insert((Manager::Unknown, "__refresh_installed__".to_string()), cancel);
        }
        let op_cancel = Arc::clone(&self.op_cancel);

        tokio::spawn(async move {
            let _ = tx.send(InstalledScanEvent::new(SyncPhase::Starting, None)).await;

            if cancel_for_task.is_cancelled() {
                let _ = tx.send(InstalledScanEvent::new(SyncPhase::Failed, Some("cancelled".to_string()))).await;
            } else {
                match rescan::scan_and_merge(&cache, &resolver, &scan_paths).await {
                    Ok(count) => {
                        let _ = tx.send(InstalledScanEvent::new(SyncPhase::Done, Some(format!("merged {count} installed records")))).await;
                    }
                    Err(error) => {
                        let _ = tx.send(InstalledScanEvent::new(SyncPhase::Failed, Some(error.to_string()))).await;
                    }
                }
            }

            op_cancel.lock().unwrap().remove(&(Manager::Unknown, "__refresh_installed__".to_string()));
        });

        Box::pin(ReceiverStream::new(rx))
    }

    /// Cooperatively cancel an in-flight `refresh_installed()` scan.
    /// The Registry/Scoop walk itself is synchronous disk I/O and
    /// cannot be interrupted mid-step, but cancellation is observed
    /// before the scan starts and before the resolved set is merged
    /// into the cache.
    pub fn cancel_refresh_installed(&self) {
        if let Some(token) = self.op_cancel.lock().unwrap().get(&(Manager::Unknown, "__refresh_installed__".to_string())) {
            token.cancel();
        }
    }

    /// Install a package (spec §4.9 `install`).
    pub fn install(&self, package_id: impl Into<String>, manager: Manager, version: Option<String>) -> OperationStream {
        self.run_operation(OperationRequest::install(package_id, manager, version))
    }

    /// Uninstall a package (spec §4.9 `uninstall`). Refused up front
    /// with `UnattributedPackage` if `manager = unknown`, without
    /// spawning any process (spec §4.7 "Confirmation policy").
    pub fn uninstall(&self, package_id: impl Into<String>, manager: Manager) -> OperationStream {
        self.run_operation(OperationRequest::uninstall(package_id, manager))
    }

    /// Cancel an in-flight install/uninstall for `(manager, package_id)`.
    pub fn cancel_operation(&self, manager: Manager, package_id: &str) {
        if let Some(token) = self.op_cancel.lock().unwrap().get(&(manager, package_id.to_string())) {
            token.cancel();
        }
    }

    fn run_operation(&self, request: OperationRequest) -> OperationStream {
        let (progress_tx, progress_rx) = mpsc::channel(16);
        let (events_tx, events_rx) = mpsc::channel(16);
        let engine = Arc::clone(&self.engine);
        let cancel = CancellationToken::new();
        let key = (request.manager, request.package_id.clone());
        self.op_cancel.lock().unwrap().insert(key.clone(), cancel.clone());
        let op_cancel = Arc::clone(&self.op_cancel);

        tokio::spawn(forward_progress(progress_rx, events_tx.clone()));

        tokio::spawn(async move {
            let result = engine.execute(request, Some(progress_tx), Some(cancel)).await;
            let mapped = result.map_err(OperationStreamError::from);
            let _ = events_tx.send(OperationStreamEvent::Finished(mapped)).await;
            op_cancel.lock().unwrap().remove(&key);
        });

        Box::pin(ReceiverStream::new(events_rx))
    }

    /// Look up a package's details: the cache first, then (if absent)
    /// the provider's own on-demand lookup — the path lazy ecosystems
    /// like npm and cargo rely on, since their full catalog is never
    /// mirrored locally (spec §4.9 `get_details`).
    pub async fn get_details(&self, package_id: &str, manager: Manager) -> Result<Option<PackageRecord>> {
        if let Some(record) = self.cache.get_by_id(package_id, manager).await? {
            return Ok(Some(record));
        }

        match self.providers.get(manager) {
            Some(provider) => Ok(provider.fetch_one(package_id).await?),
            None => Ok(None),
        }
    }

    /// Freshness summary for every catalog provider (spec §4.9
    /// `get_freshness_summary`).
    pub async fn get_freshness_summary(&self) -> Result<HashMap<Manager, Freshness>> {
        let mut summary = HashMap::new();
        for manager in Manager::CATALOG_PROVIDERS {
            summary.insert(manager, self.cache.freshness(manager).await?);
        }
        Ok(summary)
    }
}

async fn forward_progress(mut progress_rx: mpsc::Receiver<OperationProgressEvent>, events_tx: mpsc::Sender<OperationStreamEvent>) {
    while let Some(event) = progress_rx.recv().await {
        if events_tx.send(OperationStreamEvent::Progress(event)).await.is_err() {
            warn!("operation event receiver dropped while forwarding progress");
            break;
        }
    }
}
