//! Sync Orchestrator (spec §4.5, C6): drives catalog providers into the
//! metadata cache.
//!
//! Bookkeeping for "at most one sync per provider, concurrent callers
//! coalesce onto it" (spec §5 "Ordering") is shaped after
//! `vx_runtime::context::RuntimeContext`'s cache-or-fetch pattern: check
//! for in-progress/cached work first, only do the work once, let late
//! arrivals observe what the first caller produces.

mod power;
mod progress;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::{stream, Stream, StreamExt};
use tokio::sync::{broadcast, Semaphore};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use winpacman_cache::MetadataCache;
use winpacman_model::{Manager, SyncStatus};
use winpacman_provider::{CatalogProvider, ProviderRegistry};

pub use progress::{SyncPhase, SyncProgressEvent};

/// Records committed per transaction (spec §4.4 "bulk-inserts new rows
/// in batches of 1,000-5,000").
const BATCH_SIZE: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("no provider registered for {0}")]
    UnknownProvider(Manager),

    #[error(transparent)]
    Cache(#[from] winpacman_cache::CacheError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// A cancellable sequence of progress events.
pub type ProgressStream = std::pin::Pin<Box<dyn Stream<Item = SyncProgressEvent> + Send>>;

/// How `refresh_all` schedules its per-provider refreshes (spec §4.5
/// "runs providers sequentially ... or in parallel (bounded degree
/// 2-3)").
#[derive(Debug, Clone, Copy)]
pub enum RefreshConcurrency {
    Sequential,
    Parallel(usize),
}

impl RefreshConcurrency {
    fn permits(self) -> usize {
        match self {
            RefreshConcurrency::Sequential => 1,
            RefreshConcurrency::Parallel(degree) => degree.clamp(2, 3),
        }
    }
}

struct InFlightSync {
    cancel: CancellationToken,
    events: broadcast::Sender<SyncProgressEvent>,
}

struct Inner {
    cache: MetadataCache,
    providers: ProviderRegistry,
    in_flight: Mutex<HashMap<Manager, InFlightSync>>,
    power: power::PowerState,
}

/// Drives providers into the cache, one sync per provider at a time
/// (spec §4.5, C6). Cheap to clone; every clone shares the same
/// in-flight bookkeeping and cache handle.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

impl SyncOrchestrator {
    pub fn new(cache: MetadataCache, providers: ProviderRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                providers,
                in_flight: Mutex::new(HashMap::new()),
                power: power::PowerState::new(),
            }),
        }
    }

    /// Refresh one provider's catalog slice. If `force` is false and
    /// the provider's own freshness policy says the cache is still
    /// current, this is a no-op that emits a single `done` event.
    /// Concurrent calls for the same provider coalesce onto whichever
    /// refresh is already running (spec §5 "Ordering").
    pub async fn refresh_one(&self, provider: Manager, force: bool) -> Result<ProgressStream> {
        self.refresh_one_bounded(provider, force, None).await
    }

    /// Refresh every catalog provider, either one at a time or with a
    /// bounded degree of parallelism (spec §4.5 `refresh_all`). Returns
    /// one merged stream; each event's `provider` field disambiguates
    /// which refresh it belongs to.
    pub async fn refresh_all(&self, force: bool, concurrency: RefreshConcurrency) -> Result<ProgressStream> {
        let semaphore = Arc::new(Semaphore::new(concurrency.permits()));
        let mut streams = Vec::new();
        for provider in Manager::CATALOG_PROVIDERS {
            let stream = self.refresh_one_bounded(provider, force, Some(Arc::clone(&semaphore))).await?;
            streams.push(stream);
        }
        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Cooperatively cancel a provider's in-flight sync, if any (spec
    /// §4.5 `cancel`). The batch currently committing finishes;
    /// subsequent batches are not started.
    pub fn cancel(&self, provider: Manager) {
        if let Some(in_flight) = self.inner.in_flight.lock().unwrap().get(&provider) {
            in_flight.cancel.cancel();
        }
    }

    /// Whether `provider` has a sync currently running.
    pub fn is_syncing(&self, provider: Manager) -> bool {
        self.inner.in_flight.lock().unwrap().contains_key(&provider)
    }

    async fn refresh_one_bounded(
        &self,
        provider: Manager,
        force: bool,
        limiter: Option<Arc<Semaphore>>,
    ) -> Result<ProgressStream> {
        let catalog = self.inner.providers.get(provider).ok_or(SyncError::UnknownProvider(provider))?;

        if !force {
            let freshness = self.inner.cache.freshness(provider).await?;
            if !catalog.is_stale(freshness.last_sync_at) {
                return Ok(single_event_stream(SyncProgressEvent::done(provider, "cache already fresh")));
            }
        }

        if let Some(existing) = self.inner.in_flight.lock().unwrap().get(&provider) {
            return Ok(wrap_broadcast(existing.events.subscribe()));
        }

        let (tx, rx) = broadcast::channel(256);
        let cancel = CancellationToken::new();
        self.inner
            .in_flight
            .lock()
            .unwrap()
            .insert(provider, InFlightSync { cancel: cancel.clone(), events: tx.clone() });

        let orchestrator = self.clone();
        tokio::spawn(async move {
            let _permit = match &limiter {
                Some(semaphore) => Some(semaphore.clone().acquire_owned().await.expect("semaphore never closed")),
                None => None,
            };
            orchestrator.drive_refresh(provider, catalog, tx, cancel).await;
            orchestrator.inner.in_flight.lock().unwrap().remove(&provider);
        });

        Ok(wrap_broadcast(rx))
    }

    async fn drive_refresh(
        &self,
        provider: Manager,
        catalog: Arc<dyn CatalogProvider>,
        events: broadcast::Sender<SyncProgressEvent>,
        cancel: CancellationToken,
    ) {
        let _power = self.inner.power.acquire();
        let mut gate = progress::CoalesceGate::new();
        emit(&events, &mut gate, SyncProgressEvent::starting(provider));

        let stream = match catalog.fetch_all().await {
            Ok(stream) => stream,
            Err(error) => {
                let session = self.inner.cache.begin_refresh(provider);
                let _ = session.finish(SyncStatus::Failed, Some(error.to_string())).await;
                emit(&events, &mut gate, SyncProgressEvent::failed(provider, error.to_string()));
                return;
            }
        };

        tokio::pin!(stream);
        let mut session = self.inner.cache.begin_refresh(provider);
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut current = 0u64;
        let mut parse_errors = 0u64;
        let mut cancelled = false;
        let mut failed = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match stream.next().await {
                Some(Ok(record)) => {
                    batch.push(record);
                    current += 1;
                    emit(&events, &mut gate, SyncProgressEvent::new(provider, SyncPhase::Fetching, current, None, None));

                    if batch.len() >= BATCH_SIZE {
                        if let Err(error) = session.commit_batch(std::mem::take(&mut batch)).await {
                            warn!(provider = %provider, %error, "batch commit failed");
                            failed = true;
                            break;
                        }
                        emit(&events, &mut gate, SyncProgressEvent::new(provider, SyncPhase::Writing, current, None, None));
                    }
                }
                Some(Err(error)) => {
                    // Bad records are dropped and counted, the sync
                    // continues (spec §7 "ProviderParse").
                    parse_errors += 1;
                    warn!(provider = %provider, %error, parse_errors, "dropping unparsable record");
                }
                None => break,
            }
        }

        if !cancelled && !failed && !batch.is_empty() {
            if let Err(error) = session.commit_batch(batch).await {
                warn!(provider = %provider, %error, "final batch commit failed");
                failed = true;
            }
        }

        let status = if cancelled || failed {
            SyncStatus::Failed
        } else if parse_errors > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Success
        };

        let error_message = match status {
            SyncStatus::Success => None,
            SyncStatus::Partial => Some(format!("{parse_errors} records failed to parse")),
            SyncStatus::Failed if cancelled => Some("cancelled".to_string()),
            SyncStatus::Failed => Some(format!("sync failed after {} committed rows", session.committed_so_far())),
        };

        let committed = session.committed_so_far();
        if let Err(error) = session.finish(status, error_message).await {
            warn!(provider = %provider, %error, "failed to record sync_metadata");
        }

        info!(provider = %provider, committed, ?status, "sync finished");

        let final_event = match status {
            SyncStatus::Success | SyncStatus::Partial => {
                SyncProgressEvent::done(provider, format!("synced {committed} records"))
            }
            SyncStatus::Failed => SyncProgressEvent::failed(provider, "sync cancelled or failed"),
        };
        emit(&events, &mut gate, final_event);
    }
}

fn emit(sender: &broadcast::Sender<SyncProgressEvent>, gate: &mut progress::CoalesceGate, event: SyncProgressEvent) {
    if gate.allow(&event) {
        // No subscribers is not an error; the caller may have dropped
        // its stream to cancel (spec §5 "Cancellation").
        let _ = sender.send(event);
    }
}

fn wrap_broadcast(rx: broadcast::Receiver<SyncProgressEvent>) -> ProgressStream {
    Box::pin(BroadcastStream::new(rx).filter_map(|item| async move { item.ok() }))
}

fn single_event_stream(event: SyncProgressEvent) -> ProgressStream {
    Box::pin(stream::iter(std::iter::once(event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use winpacman_model::{PackageRecord, Version};
    use winpacman_provider::{ProviderError, ProviderStream};

    struct StubProvider {
        manager: Manager,
        records: Vec<PackageRecord>,
        always_stale: bool,
    }

    #[async_trait]
    impl CatalogProvider for StubProvider {
        fn name(&self) -> Manager {
            self.manager
        }

        async fn fetch_all(&self) -> winpacman_provider::Result<ProviderStream> {
            let records = self.records.clone();
            let items: Vec<std::result::Result<PackageRecord, ProviderError>> =
                records.into_iter().map(Ok).collect();
            Ok(Box::pin(stream::iter(items)))
        }

        async fn fetch_one(&self, _package_id: &str) -> winpacman_provider::Result<Option<PackageRecord>> {
            Ok(None)
        }

        fn is_stale(&self, last_sync: Option<DateTime<Utc>>) -> bool {
            self.always_stale || last_sync.is_none()
        }
    }

    fn record(id: &str, manager: Manager) -> PackageRecord {
        PackageRecord::new(id, id, Version::new("1.0.0"), manager, Utc::now())
    }

    async fn orchestrator_with(provider: StubProvider) -> SyncOrchestrator {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(provider));
        SyncOrchestrator::new(cache, registry)
    }

    #[tokio::test]
    async fn refresh_one_commits_records_and_reports_done() {
        let provider = StubProvider {
            manager: Manager::Npm,
            records: vec![record("left-pad", Manager::Npm), record("chalk", Manager::Npm)],
            always_stale: true,
        };
        let orchestrator = orchestrator_with(provider).await;

        let events: Vec<_> = orchestrator.refresh_one(Manager::Npm, true).await.unwrap().collect().await;
        assert!(events.iter().any(|e| e.phase == SyncPhase::Done));

        let installed = orchestrator.inner.cache.search("chalk", None, 10).await.unwrap();
        assert_eq!(installed.len(), 1);
    }

    #[tokio::test]
    async fn refresh_one_without_force_on_fresh_cache_is_a_noop() {
        let provider = StubProvider { manager: Manager::Winget, records: vec![], always_stale: false };
        let orchestrator = orchestrator_with(provider).await;

        let events: Vec<_> = orchestrator.refresh_one(Manager::Winget, false).await.unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, SyncPhase::Done);
        assert_eq!(events[0].message.as_deref(), Some("cache already fresh"));
    }

    #[tokio::test]
    async fn unknown_provider_is_an_error() {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let orchestrator = SyncOrchestrator::new(cache, ProviderRegistry::new());
        let result = orchestrator.refresh_one(Manager::Cargo, true).await;
        assert!(matches!(result, Err(SyncError::UnknownProvider(Manager::Cargo))));
    }

    #[tokio::test]
    async fn cancel_on_an_idle_provider_is_a_harmless_noop() {
        let provider = StubProvider { manager: Manager::Scoop, records: vec![], always_stale: true };
        let orchestrator = orchestrator_with(provider).await;
        orchestrator.cancel(Manager::Scoop);
        assert!(!orchestrator.is_syncing(Manager::Scoop));
    }
}
