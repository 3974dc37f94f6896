//! Installed-inventory scan pipeline: Registry + Scoop scan (C3) ->
//! attribution (C7) -> cache merge (C5). Shared between the façade's
//! own `refresh_installed()` and the install/uninstall engine's
//! post-operation rescan hook (spec §4.7 step 6, §4.9
//! `refresh_installed`).

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;
use winpacman_cache::MetadataCache;
use winpacman_resolver::ManagerResolver;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct InstalledScanPaths {
    pub scoop_apps_dir: PathBuf,
}

pub(crate) async fn scan_and_merge(cache: &MetadataCache, resolver: &ManagerResolver, paths: &InstalledScanPaths) -> Result<u64> {
    let registry_entries = winpacman_registry::scan()?;
    let scoop_entries = winpacman_registry::scan_scoop_inventory(&paths.scoop_apps_dir);
    let resolved = resolver.resolve_installed_inventory(&registry_entries, &scoop_entries).await?;
    let count = resolved.len() as u64;
    cache.sync_installed(resolved).await?;
    Ok(count)
}

/// Adapts [`scan_and_merge`] to `winpacman_engine::InstalledRescanTrigger`
/// so C8 can ask for a rescan after a successful install/uninstall
/// without depending on the registry, resolver, or cache crates itself
/// (spec §4.7 step 6).
pub(crate) struct RescanTrigger {
    pub cache: MetadataCache,
    pub resolver: Arc<ManagerResolver>,
    pub paths: InstalledScanPaths,
}

#[async_trait::async_trait]
impl winpacman_engine::InstalledRescanTrigger for RescanTrigger {
    async fn rescan(&self) {
        if let Err(error) = scan_and_merge(&self.cache, &self.resolver, &self.paths).await {
            warn!(%error, "installed-inventory rescan after install/uninstall failed");
        }
    }
}
