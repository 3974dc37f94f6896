//! Manager Resolver (spec §4.6, C7): attributes Registry/Scoop-sourced
//! installed inventory to a real catalog provider, never guessing past
//! what a cache match or a cross-validated fingerprint supports.
//!
//! Grounded directly on `vx_system_pm::resolver::SystemDependencyResolver`
//! and `vx_system_pm::detector::PackageManagerDetector`'s detect-then-
//! resolve shape: a cheap local guess (fingerprint / detector probe)
//! first, then a targeted check against manager-owned evidence before
//! the guess is trusted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use winpacman_cache::MetadataCache;
use winpacman_model::{Manager, PackageRecord, Version};
use winpacman_registry::{RegistryEntry, ScoopInventoryEntry};

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error(transparent)]
    Cache(#[from] winpacman_cache::CacheError),
}

pub type Result<T> = std::result::Result<T, ResolverError>;

/// Where to look for manager-owned evidence when cross-validating a
/// fingerprint guess (spec §4.6 step 3).
pub struct ResolverPaths {
    pub installed_db: PathBuf,
    pub chocolatey_lib_dir: PathBuf,
}

pub struct ManagerResolver {
    cache: MetadataCache,
    paths: ResolverPaths,
}

impl ManagerResolver {
    pub fn new(cache: MetadataCache, paths: ResolverPaths) -> Self {
        Self { cache, paths }
    }

    /// Resolve one Registry-sourced entry into an installed
    /// [`PackageRecord`] (spec §4.6 steps 1-3). The resulting record's
    /// `manager` and `install_source` are the resolver's best-supported
    /// attribution; `Manager::Unknown` means neither a cache match nor a
    /// validated fingerprint supported anything stronger.
    pub async fn resolve_registry_entry(&self, entry: &RegistryEntry) -> Result<PackageRecord> {
        let attributed = self.attribute_registry_entry(entry).await?;
        Ok(record_from_registry_entry(entry, attributed))
    }

    async fn attribute_registry_entry(&self, entry: &RegistryEntry) -> Result<Manager> {
        // Step 1-2: a cache match always wins over a guessed fingerprint.
        if let Some(manager) = self.cache.find_manager(&entry.subkey_name, &entry.display_name).await? {
            return Ok(manager);
        }

        // Step 3: cross-validate the fingerprint guess against
        // manager-owned evidence; only Winget and Chocolatey have a
        // defined evidence source. A Scoop fingerprint here is
        // downgraded to unknown: Scoop never writes its own Uninstall
        // keys, so seeing one is itself only explainable by a bundled
        // sub-installer, not by the app actually being a Scoop install
        // (the direct Scoop manifest read in `resolve_scoop_entry` is
        // the ground truth for Scoop attribution, not this path).
        let fingerprint = entry.fingerprint();
        let validated = match fingerprint {
            Manager::Winget => {
                is_in_winget_installed_db(&self.paths.installed_db, entry) && fingerprint == Manager::Winget
            }
            Manager::Chocolatey => chocolatey_folder_matches(&self.paths.chocolatey_lib_dir, &entry.display_name),
            // The `WindowsApps` path substring that produces this guess
            // is itself conclusive; there's no separate manager-owned
            // store to cross-check it against.
            Manager::Msstore => true,
            _ => false,
        };

        Ok(if validated { fingerprint } else { Manager::Unknown })
    }

    /// Resolve one Scoop-sourced inventory entry. Scoop never writes
    /// Registry uninstall keys, so a direct read of its own
    /// `current/manifest.json` is ground truth — no cache lookup or
    /// cross-validation needed (spec §9 resolution (a)).
    pub fn resolve_scoop_entry(&self, entry: &ScoopInventoryEntry) -> PackageRecord {
        let mut record = PackageRecord::new(&entry.name, &entry.name, Version::new(entry.version.clone()), Manager::Scoop, Utc::now());
        record.is_installed = true;
        record.installed_version = Some(entry.version.clone());
        record.install_source = Some(Manager::Scoop);
        record.install_location = Some(entry.install_location.clone());
        record.refresh_search_tokens();
        record
    }

    /// Resolve a full installed-inventory snapshot: every Registry entry,
    /// every Scoop entry, with Scoop-fingerprinted Registry duplicates of
    /// a confirmed Scoop app dropped in favor of the direct manifest read
    /// (spec §9 resolution (a)).
    pub async fn resolve_installed_inventory(
        &self,
        registry_entries: &[RegistryEntry],
        scoop_entries: &[ScoopInventoryEntry],
    ) -> Result<Vec<PackageRecord>> {
        let mut resolved = Vec::with_capacity(registry_entries.len() + scoop_entries.len());
        for entry in registry_entries {
            resolved.push(self.resolve_registry_entry(entry).await?);
        }

        let scoop_records: Vec<PackageRecord> = scoop_entries.iter().map(|e| self.resolve_scoop_entry(e)).collect();
        let scoop_names: HashSet<String> = scoop_records.iter().map(|r| r.name.to_lowercase()).collect();

        resolved.retain(|r| !(r.manager == Manager::Scoop && scoop_names.contains(&r.name.to_lowercase())));
        resolved.extend(scoop_records);
        Ok(resolved)
    }
}

fn record_from_registry_entry(entry: &RegistryEntry, manager: Manager) -> PackageRecord {
    let version = entry.display_version.clone().unwrap_or_else(|| "0.0.0".to_string());
    let mut record = PackageRecord::new(&entry.subkey_name, &entry.display_name, Version::new(version.clone()), manager, Utc::now());
    record.publisher = entry.publisher.clone();
    record.is_installed = true;
    record.installed_version = Some(version);
    record.install_source = Some(manager);
    record.install_location = entry.resolved_install_path();
    record.refresh_search_tokens();
    record
}

fn is_in_winget_installed_db(db_path: &Path, entry: &RegistryEntry) -> bool {
    winpacman_provider_winget::is_in_installed_db(db_path, &entry.subkey_name)
        || winpacman_provider_winget::is_in_installed_db(db_path, &entry.display_name)
}

/// Loose match between a Registry `DisplayName` and a `.chocolatey`
/// package folder name (typically `<id>.<version>`): both sides are
/// reduced to their alphanumeric characters and compared as prefixes,
/// since neither side's exact casing or separators is reliable.
fn chocolatey_folder_matches(lib_dir: &Path, display_name: &str) -> bool {
    let target = normalize(display_name);
    if target.is_empty() {
        return false;
    }

    let Ok(read_dir) = std::fs::read_dir(lib_dir) else {
        return false;
    };

    read_dir.flatten().any(|dir_entry| {
        dir_entry
            .file_name()
            .to_str()
            .map(|name| {
                let candidate = normalize(name);
                !candidate.is_empty() && (candidate.starts_with(&target) || target.starts_with(&candidate))
            })
            .unwrap_or(false)
    })
}

fn normalize(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use winpacman_registry::Hive;

    fn registry_entry(subkey_name: &str, display_name: &str, install_source: Option<&str>, install_location: Option<&str>) -> RegistryEntry {
        RegistryEntry {
            subkey_name: subkey_name.to_string(),
            display_name: display_name.to_string(),
            display_version: Some("1.0.0".into()),
            publisher: None,
            install_location: install_location.map(str::to_string),
            install_path: None,
            install_source: install_source.map(str::to_string),
            install_date: None,
            uninstall_string: None,
            install_string: None,
            hive: Hive::HklmNative,
        }
    }

    async fn resolver_with_cache() -> (ManagerResolver, tempfile::TempDir) {
        let cache = MetadataCache::open_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let resolver = ManagerResolver::new(
            cache,
            ResolverPaths {
                installed_db: dir.path().join("installed.db"),
                chocolatey_lib_dir: dir.path().join(".chocolatey"),
            },
        );
        (resolver, dir)
    }

    #[tokio::test]
    async fn cache_match_wins_over_no_fingerprint() {
        let (resolver, _dir) = resolver_with_cache().await;
        resolver
            .cache
            .refresh(
                Manager::Winget,
                vec![PackageRecord::new("Charmbracelet.neo-cowsay", "Neo Cowsay", Version::new("1.0.0"), Manager::Winget, Utc::now())],
                1000,
            )
            .await
            .unwrap();

        let entry = registry_entry("{SOME-GUID}", "Neo Cowsay", None, None);
        let record = resolver.resolve_registry_entry(&entry).await.unwrap();
        assert_eq!(record.manager, Manager::Winget);
        assert_eq!(record.install_source, Some(Manager::Winget));
    }

    #[tokio::test]
    async fn unvalidated_winget_fingerprint_downgrades_to_unknown() {
        let (resolver, _dir) = resolver_with_cache().await;
        let entry = registry_entry("{SOME-GUID}", "Not In Cache", Some("Microsoft.DesktopAppInstaller"), None);
        let record = resolver.resolve_registry_entry(&entry).await.unwrap();
        assert_eq!(record.manager, Manager::Unknown);
    }

    #[tokio::test]
    async fn chocolatey_fingerprint_validated_by_matching_folder() {
        let (resolver, dir) = resolver_with_cache().await;
        let lib_dir = dir.path().join(".chocolatey");
        std::fs::create_dir_all(lib_dir.join("git.2.43.0")).unwrap();

        let entry = registry_entry("Git_is1", "Git", Some("Chocolatey"), None);
        let record = resolver.resolve_registry_entry(&entry).await.unwrap();
        assert_eq!(record.manager, Manager::Chocolatey);
    }

    #[tokio::test]
    async fn scoop_fingerprint_without_inventory_confirmation_downgrades() {
        let (resolver, _dir) = resolver_with_cache().await;
        let entry = registry_entry("{SOME-GUID}", "Vim", None, Some(r"C:\Users\me\scoop\apps\vim\current"));
        let record = resolver.resolve_registry_entry(&entry).await.unwrap();
        assert_eq!(record.manager, Manager::Unknown);
    }

    #[tokio::test]
    async fn scoop_inventory_is_ground_truth() {
        let (resolver, _dir) = resolver_with_cache().await;
        let entry = ScoopInventoryEntry { name: "vim".into(), version: "9.1.0".into(), install_location: PathBuf::from(r"C:\scoop\apps\vim\current") };
        let record = resolver.resolve_scoop_entry(&entry);
        assert_eq!(record.manager, Manager::Scoop);
        assert_eq!(record.install_source, Some(Manager::Scoop));
    }

    #[tokio::test]
    async fn installed_inventory_prefers_scoop_manifest_over_scoop_fingerprinted_registry_duplicate() {
        let (resolver, _dir) = resolver_with_cache().await;
        let registry_entries = vec![registry_entry("{SOME-GUID}", "vim", None, Some(r"C:\Users\me\scoop\apps\vim\current"))];
        let scoop_entries = vec![ScoopInventoryEntry { name: "vim".into(), version: "9.1.0".into(), install_location: PathBuf::from(r"C:\scoop\apps\vim\current") }];

        let resolved = resolver.resolve_installed_inventory(&registry_entries, &scoop_entries).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].install_source, Some(Manager::Scoop));
    }
}
