//! The `CatalogProvider` trait and a flat registry of them (spec §4.3).
//!
//! Shaped after `vx_runtime_core::provider::Provider` (a container
//! object exposing a uniform capability set) and
//! `vx_cli::registry::create_registry` (flat, explicit registration of
//! one concrete provider per slot) — reworked here from "one runtime
//! provider supplying several tool runtimes" to "one catalog provider
//! per package-manager ecosystem".

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use winpacman_model::{Manager, PackageRecord};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network request failed: {0}")]
    Network(String),

    #[error("failed to parse response from {source}: {message}")]
    Parse { source: String, message: String },

    #[error("local catalog source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// A lazily-produced, cancellable sequence of records (spec §4.3 "All
/// `fetch_*` operations are cancellable (the orchestrator may drop the
/// iterator)"). Dropping the stream before exhausting it is always
/// safe — providers must not rely on running to completion for
/// correctness.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<PackageRecord>> + Send>>;

/// Uniform capability set every package-manager catalog provider
/// implements (spec §4.3).
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Which ecosystem this is.
    fn name(&self) -> Manager;

    /// Lazy stream used by full syncs. Implementations should do as
    /// little eager work as possible before yielding the first item, so
    /// an orchestrator-level cancellation can take effect quickly.
    async fn fetch_all(&self) -> Result<ProviderStream>;

    /// On-demand detail enrichment, and the primary lookup path for
    /// lazy ecosystems (npm, cargo) that never mirror their full
    /// catalog locally.
    async fn fetch_one(&self, package_id: &str) -> Result<Option<PackageRecord>>;

    /// Freshness policy: should a sync be considered due given the time
    /// since the last successful sync (spec §4.5 "Freshness policy
    /// defaults")? `None` means never synced.
    fn is_stale(&self, last_sync: Option<DateTime<Utc>>) -> bool;

    /// Upper bound this provider promises to respect on its own
    /// outbound request rate, if any (e.g. Chocolatey's ≤10 req/s).
    /// `None` means no self-imposed limit.
    fn rate_limit_interval(&self) -> Option<Duration> {
        None
    }
}

/// A flat collection of registered providers, keyed by [`Manager`].
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CatalogProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn CatalogProvider>) {
        self.providers.push(provider);
    }

    pub fn get(&self, manager: Manager) -> Option<Arc<dyn CatalogProvider>> {
        self.providers.iter().find(|p| p.name() == manager).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn CatalogProvider>> {
        self.providers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    struct StubProvider(Manager);

    #[async_trait]
    impl CatalogProvider for StubProvider {
        fn name(&self) -> Manager {
            self.0
        }

        async fn fetch_all(&self) -> Result<ProviderStream> {
            Ok(Box::pin(stream::empty()))
        }

        async fn fetch_one(&self, _package_id: &str) -> Result<Option<PackageRecord>> {
            Ok(None)
        }

        fn is_stale(&self, last_sync: Option<DateTime<Utc>>) -> bool {
            last_sync.is_none()
        }
    }

    #[test]
    fn registry_looks_up_by_manager() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider(Manager::Npm)));
        registry.register(Arc::new(StubProvider(Manager::Cargo)));

        assert!(registry.get(Manager::Npm).is_some());
        assert!(registry.get(Manager::Winget).is_none());
        assert_eq!(registry.all().len(), 2);
    }

    #[tokio::test]
    async fn stub_stream_can_be_cancelled_by_dropping() {
        let provider = StubProvider(Manager::Scoop);
        let stream = provider.fetch_all().await.unwrap();
        drop(stream);
    }
}
