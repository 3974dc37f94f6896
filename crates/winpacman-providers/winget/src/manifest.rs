//! Manifest repository tree walk (spec §4.3.1 steps 1-4).

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;
use winpacman_model::{Manager, PackageRecord, Version};

#[derive(Debug, PartialEq, Eq)]
enum ManifestKind {
    Root,
    Installer,
    Locale,
}

/// Classify a manifest file by path substring (spec §4.3.1 step 1).
/// Installer manifests carry per-architecture/scope installer entries
/// that the canonical record (spec §3) has no field for, so they are
/// classified here only to be skipped alongside locale manifests — the
/// catalog's fields all come from the root manifest.
fn classify(path: &Path) -> ManifestKind {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    if name.contains(".locale.") {
        ManifestKind::Locale
    } else if name.contains(".installer.") {
        ManifestKind::Installer
    } else {
        ManifestKind::Root
    }
}

#[derive(Debug, Deserialize)]
struct RootManifest {
    #[serde(rename = "PackageIdentifier")]
    package_identifier: String,
    #[serde(rename = "PackageVersion")]
    package_version: String,
    #[serde(rename = "PackageName", default)]
    package_name: Option<String>,
    #[serde(rename = "Publisher", default)]
    publisher: Option<String>,
    #[serde(rename = "License", default)]
    license: Option<String>,
    #[serde(rename = "ShortDescription", default)]
    short_description: Option<String>,
    #[serde(rename = "PackageUrl", default)]
    package_url: Option<String>,
    #[serde(rename = "Tags", default)]
    tags: Vec<serde_yaml::Value>,
}

/// Coerce a YAML tag value to a string (spec §4.3.1 step 3: "tag values
/// are coerced to string (YAML may yield integers)").
fn coerce_tag_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The collapsed, emitted catalog: one record per package id (latest
/// version), plus the full version history per id for install targeting
/// (spec §4.3.1 step 4).
#[derive(Debug, Default)]
pub struct WingetCatalog {
    pub records: Vec<PackageRecord>,
    pub versions_by_id: HashMap<String, Vec<Version>>,
}

/// Walk `manifests_root`, classify/collapse/normalize/emit (spec
/// §4.3.1). Unparseable individual files are logged and skipped rather
/// than failing the whole scan — a malformed manifest in a repository of
/// tens of thousands should not block the rest of the catalog.
pub fn scan_manifests(manifests_root: &Path, now: DateTime<Utc>) -> WingetCatalog {
    // Collapse: dedupe on (PackageIdentifier, PackageVersion); first
    // occurrence wins, later duplicates are ignored (spec step 2).
    let mut roots: HashMap<(String, String), RootManifest> = HashMap::new();

    for entry in WalkDir::new(manifests_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
            continue;
        }

        match classify(path) {
            ManifestKind::Locale => continue,
            ManifestKind::Root => match read_yaml::<RootManifest>(path) {
                Ok(manifest) => {
                    let key = (manifest.package_identifier.clone(), manifest.package_version.clone());
                    roots.entry(key).or_insert(manifest);
                }
                Err(error) => warn!(path = %path.display(), %error, "failed to parse winget root manifest"),
            },
            // Installer manifests contribute no field the canonical
            // record stores (spec §3); skip them entirely, same as
            // locale manifests.
            ManifestKind::Installer => continue,
        }
    }

    emit(roots, now)
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_yaml::from_str(&contents).map_err(|e| e.to_string())
}

fn emit(roots: HashMap<(String, String), RootManifest>, now: DateTime<Utc>) -> WingetCatalog {
    let mut by_id: HashMap<String, Vec<(Version, RootManifest)>> = HashMap::new();
    for ((id, version), manifest) in roots {
        by_id.entry(id).or_default().push((Version::new(version), manifest));
    }

    let mut catalog = WingetCatalog::default();

    for (id, mut versions) in by_id {
        versions.sort_by(|a, b| b.0.cmp(&a.0));
        let (latest_version, latest_manifest) = &versions[0];

        let name = latest_manifest.package_name.clone().unwrap_or_else(|| id.clone());
        let mut record = PackageRecord::new(id.clone(), name, latest_version.clone(), Manager::Winget, now);
        record.publisher = latest_manifest.publisher.clone();
        record.description = latest_manifest.short_description.clone();
        record.homepage = latest_manifest.package_url.clone();
        record.license = latest_manifest.license.clone();
        record.tags = latest_manifest.tags.iter().filter_map(coerce_tag_to_string).collect();
        record.refresh_search_tokens();

        catalog
            .versions_by_id
            .insert(id.clone(), versions.iter().map(|(v, _)| v.clone()).collect());
        catalog.records.push(record);
    }

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn write_manifest(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn locale_manifests_are_skipped_entirely() {
        let root = tempfile::tempdir().unwrap();
        let pkg_dir = root.path().join("m/Neo/Cowsay/1.0.0");
        fs::create_dir_all(&pkg_dir).unwrap();
        write_manifest(
            &pkg_dir,
            "Neo.Cowsay.yaml",
            "PackageIdentifier: Neo.Cowsay\nPackageVersion: 1.0.0\nPackageName: Neo Cowsay\n",
        );
        write_manifest(
            &pkg_dir,
            "Neo.Cowsay.locale.en-US.yaml",
            "PackageIdentifier: Neo.Cowsay\nPackageVersion: 1.0.0\nPublisher: Should Not Be Used\n",
        );

        let catalog = scan_manifests(root.path(), now());
        assert_eq!(catalog.records.len(), 1);
        assert_eq!(catalog.records[0].publisher, None);
    }

    #[test]
    fn dedupes_on_identifier_and_version_keeping_first() {
        let root = tempfile::tempdir().unwrap();
        let pkg_dir = root.path().join("m/Neo/Cowsay/1.0.0");
        fs::create_dir_all(&pkg_dir).unwrap();
        write_manifest(
            &pkg_dir,
            "Neo.Cowsay.yaml",
            "PackageIdentifier: Neo.Cowsay\nPackageVersion: 1.0.0\nPublisher: First\n",
        );
        // A duplicate root manifest for the same key elsewhere in the tree.
        let dup_dir = root.path().join("m/Neo/Cowsay-dup/1.0.0");
        fs::create_dir_all(&dup_dir).unwrap();
        write_manifest(
            &dup_dir,
            "Neo.Cowsay.yaml",
            "PackageIdentifier: Neo.Cowsay\nPackageVersion: 1.0.0\nPublisher: Second\n",
        );

        let catalog = scan_manifests(root.path(), now());
        assert_eq!(catalog.records.len(), 1);
        assert_eq!(catalog.records[0].publisher, Some("First".to_string()));
    }

    #[test]
    fn latest_version_wins_earlier_retained_in_versions_store() {
        let root = tempfile::tempdir().unwrap();
        for version in ["1.0.0", "2.0.0"] {
            let pkg_dir = root.path().join(format!("m/Neo/Cowsay/{version}"));
            fs::create_dir_all(&pkg_dir).unwrap();
            write_manifest(
                &pkg_dir,
                "Neo.Cowsay.yaml",
                &format!("PackageIdentifier: Neo.Cowsay\nPackageVersion: {version}\n"),
            );
        }

        let catalog = scan_manifests(root.path(), now());
        assert_eq!(catalog.records.len(), 1);
        assert_eq!(catalog.records[0].version, Version::new("2.0.0"));
        let versions = &catalog.versions_by_id["Neo.Cowsay"];
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn tags_with_integer_values_are_coerced_to_strings() {
        let root = tempfile::tempdir().unwrap();
        let pkg_dir = root.path().join("m/Neo/Cowsay/1.0.0");
        fs::create_dir_all(&pkg_dir).unwrap();
        write_manifest(
            &pkg_dir,
            "Neo.Cowsay.yaml",
            "PackageIdentifier: Neo.Cowsay\nPackageVersion: 1.0.0\nTags:\n  - cli\n  - 2024\n",
        );

        let catalog = scan_manifests(root.path(), now());
        assert!(catalog.records[0].tags.contains("2024"));
        assert!(catalog.records[0].tags.contains("cli"));
    }
}
