//! WinGet catalog provider (spec §4.3.1).
//!
//! The preferred source is a local clone of the community manifest
//! repository (`manifests/<letter>/<Publisher>/<PackageName>/<Version>/
//! *.yaml`); `installed.db` is a fallback consulted only to validate
//! installed attribution, never as the catalog itself.

mod installed_db;
mod manifest;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures_util::stream;
use tracing::debug;
use winpacman_model::{Manager, PackageRecord};
use winpacman_provider::{CatalogProvider, ProviderError, ProviderStream, Result};

pub use installed_db::contains_package_id as is_in_installed_db;
pub use manifest::{scan_manifests, WingetCatalog};

/// Freshness budget from spec §4.5 ("WinGet ≤ 1 day").
pub const FRESHNESS_BUDGET: Duration = Duration::days(1);

pub struct WingetProvider {
    manifests_root: PathBuf,
}

impl WingetProvider {
    pub fn new(manifests_root: impl Into<PathBuf>) -> Self {
        Self {
            manifests_root: manifests_root.into(),
        }
    }
}

#[async_trait]
impl CatalogProvider for WingetProvider {
    fn name(&self) -> Manager {
        Manager::Winget
    }

    async fn fetch_all(&self) -> Result<ProviderStream> {
        let root = self.manifests_root.clone();
        if !root.is_dir() {
            return Err(ProviderError::SourceUnavailable(format!(
                "manifest repository not found at {}",
                root.display()
            )));
        }

        debug!(root = %root.display(), "scanning winget manifest tree");
        let catalog = tokio::task::spawn_blocking(move || scan_manifests(&root, Utc::now()))
            .await
            .map_err(|e| ProviderError::Parse {
                source: "winget manifest scan".into(),
                message: e.to_string(),
            })?;

        let items: Vec<std::result::Result<PackageRecord, ProviderError>> =
            catalog.records.into_iter().map(Ok).collect();
        let boxed: ProviderStream = Box::pin(stream::iter(items));
        Ok(boxed)
    }

    async fn fetch_one(&self, package_id: &str) -> Result<Option<PackageRecord>> {
        let root = self.manifests_root.clone();
        if !root.is_dir() {
            return Ok(None);
        }
        let target = package_id.to_string();
        let record = tokio::task::spawn_blocking(move || {
            let catalog = scan_manifests(&root, Utc::now());
            catalog.records.into_iter().find(|r| r.package_id == target)
        })
        .await
        .map_err(|e| ProviderError::Parse {
            source: "winget manifest scan".into(),
            message: e.to_string(),
        })?;
        Ok(record)
    }

    fn is_stale(&self, last_sync: Option<DateTime<Utc>>) -> bool {
        match last_sync {
            None => true,
            Some(last) => Utc::now().signed_duration_since(last) > FRESHNESS_BUDGET,
        }
    }
}
