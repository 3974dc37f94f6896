//! Scoop catalog provider (spec §4.3.3).
//!
//! Unlike WinGet and Chocolatey, Scoop has no staleness budget: the sync
//! orchestrator re-scans the bucket tree on every explicit refresh
//! (spec §4.5), so [`is_stale`](ScoopProvider::is_stale) always reports
//! stale and lets the caller decide whether to act on it.

mod manifest;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream;
use tracing::debug;
use winpacman_model::{Manager, PackageRecord};
use winpacman_provider::{CatalogProvider, ProviderError, ProviderStream, Result};

pub use manifest::{parse_manifest, ScoopManifest};

pub struct ScoopProvider {
    buckets_root: PathBuf,
}

impl ScoopProvider {
    pub fn new(buckets_root: impl Into<PathBuf>) -> Self {
        Self {
            buckets_root: buckets_root.into(),
        }
    }
}

/// Walk `<buckets_root>/<bucket>/bucket/*.json`, yielding one record per
/// manifest file. Missing directories and unreadable/unparseable files
/// are skipped, not fatal (mirrors the registry/manifest-scan idiom used
/// by the other local-filesystem providers).
fn scan_buckets(buckets_root: &Path, now: DateTime<Utc>) -> Vec<PackageRecord> {
    let mut records = Vec::new();
    let Ok(bucket_dirs) = std::fs::read_dir(buckets_root) else {
        return records;
    };

    for bucket_entry in bucket_dirs.flatten() {
        let manifests_dir = bucket_entry.path().join("bucket");
        let Ok(manifest_files) = std::fs::read_dir(&manifests_dir) else {
            continue;
        };
        for manifest_entry in manifest_files.flatten() {
            let path = manifest_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(package_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(contents) = std::fs::read_to_string(&path) else {
                continue;
            };
            let Some(manifest) = parse_manifest(&path, &contents) else {
                continue;
            };

            let mut record = PackageRecord::new(package_id, package_id, manifest.version, Manager::Scoop, now);
            record.description = manifest.description;
            record.homepage = manifest.homepage;
            record.license = manifest.license;
            record.refresh_search_tokens();
            records.push(record);
        }
    }

    records
}

#[async_trait]
impl CatalogProvider for ScoopProvider {
    fn name(&self) -> Manager {
        Manager::Scoop
    }

    async fn fetch_all(&self) -> Result<ProviderStream> {
        let root = self.buckets_root.clone();
        if !root.is_dir() {
            return Err(ProviderError::SourceUnavailable(format!(
                "scoop buckets directory not found at {}",
                root.display()
            )));
        }

        debug!(root = %root.display(), "scanning scoop bucket manifests");
        let records = tokio::task::spawn_blocking(move || scan_buckets(&root, Utc::now()))
            .await
            .map_err(|e| ProviderError::Parse {
                source: "scoop bucket scan".into(),
                message: e.to_string(),
            })?;

        let items: Vec<std::result::Result<PackageRecord, ProviderError>> = records.into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(items)))
    }

    async fn fetch_one(&self, package_id: &str) -> Result<Option<PackageRecord>> {
        let root = self.buckets_root.clone();
        if !root.is_dir() {
            return Ok(None);
        }
        let target = package_id.to_string();
        let record = tokio::task::spawn_blocking(move || {
            scan_buckets(&root, Utc::now())
                .into_iter()
                .find(|r| r.package_id == target)
        })
        .await
        .map_err(|e| ProviderError::Parse {
            source: "scoop bucket scan".into(),
            message: e.to_string(),
        })?;
        Ok(record)
    }

    fn is_stale(&self, _last_sync: Option<DateTime<Utc>>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, bucket: &str, package: &str, json: &str) {
        let manifests_dir = dir.join(bucket).join("bucket");
        std::fs::create_dir_all(&manifests_dir).unwrap();
        std::fs::write(manifests_dir.join(format!("{package}.json")), json).unwrap();
    }

    #[tokio::test]
    async fn missing_buckets_root_is_source_unavailable() {
        let provider = ScoopProvider::new("/does/not/exist/buckets");
        let result = provider.fetch_all().await;
        assert!(matches!(result, Err(ProviderError::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn scans_manifests_across_multiple_buckets() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "main", "git", r#"{"version": "2.40.0", "license": "GPL-2.0-only"}"#);
        write_manifest(
            dir.path(),
            "extras",
            "vscode",
            r#"{"version": "1.94.0", "license": {"identifier": "MIT"}, "homepage": "https://code.visualstudio.com"}"#,
        );

        let provider = ScoopProvider::new(dir.path());
        let mut records: Vec<_> = futures_util::StreamExt::collect::<Vec<_>>(provider.fetch_all().await.unwrap())
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        records.sort_by(|a, b| a.package_id.cmp(&b.package_id));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].package_id, "git");
        assert_eq!(records[1].license.as_deref(), Some("MIT"));
    }

    #[test]
    fn scoop_provider_is_always_reported_stale() {
        let provider = ScoopProvider::new("/tmp");
        assert!(provider.is_stale(Some(Utc::now())));
    }
}
