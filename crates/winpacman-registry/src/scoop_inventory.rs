//! Scoop installed-inventory walker (spec §4.3.6 "Scoop inventory").
//!
//! Scoop deliberately never touches the Registry, so its installed set
//! has to be read straight off disk: `%USERPROFILE%\scoop\apps\<name>\
//! current\manifest.json`. Walking style grounded on
//! `vx_manifest::loader::ManifestLoader::load_from_dir`'s "missing dir
//! is not an error, bad entries are logged and skipped" shape.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// One locally installed Scoop app, as read from its `current/manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoopInventoryEntry {
    pub name: String,
    pub version: String,
    pub install_location: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ScoopManifest {
    version: Option<String>,
}

/// Walk `apps_dir` (normally `%USERPROFILE%\scoop\apps`) and return every
/// app with a readable `current/manifest.json`. A missing `apps_dir`
/// yields an empty list, not an error — Scoop may simply not be
/// installed on this machine.
pub fn scan_scoop_inventory(apps_dir: &Path) -> Vec<ScoopInventoryEntry> {
    let mut entries = Vec::new();

    let Ok(read_dir) = std::fs::read_dir(apps_dir) else {
        return entries;
    };

    for dir_entry in read_dir.flatten() {
        let app_dir = dir_entry.path();
        if !app_dir.is_dir() {
            continue;
        }
        let Some(name) = app_dir.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        let current_dir = app_dir.join("current");
        let manifest_path = current_dir.join("manifest.json");
        let Ok(contents) = std::fs::read_to_string(&manifest_path) else {
            continue;
        };

        match serde_json::from_str::<ScoopManifest>(&contents) {
            Ok(manifest) => {
                if let Some(version) = manifest.version {
                    entries.push(ScoopInventoryEntry {
                        name: name.to_string(),
                        version,
                        install_location: current_dir,
                    });
                } else {
                    warn!(app = name, "scoop manifest has no version field");
                }
            }
            Err(error) => {
                warn!(app = name, %error, "failed to parse scoop manifest.json");
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_apps_dir_yields_empty_inventory() {
        let entries = scan_scoop_inventory(Path::new(r"Z:\does\not\exist"));
        assert!(entries.is_empty());
    }

    #[test]
    fn reads_version_from_current_manifest() {
        let root = tempfile::tempdir().unwrap();
        let apps_dir = root.path().join("apps");
        let current = apps_dir.join("vim").join("current");
        std::fs::create_dir_all(&current).unwrap();
        std::fs::write(current.join("manifest.json"), r#"{"version": "9.1.0"}"#).unwrap();

        let entries = scan_scoop_inventory(&apps_dir);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "vim");
        assert_eq!(entries[0].version, "9.1.0");
        assert_eq!(entries[0].install_location, current);
    }

    #[test]
    fn skips_apps_with_unparseable_manifest() {
        let root = tempfile::tempdir().unwrap();
        let apps_dir = root.path().join("apps");
        let current = apps_dir.join("broken").join("current");
        std::fs::create_dir_all(&current).unwrap();
        std::fs::write(current.join("manifest.json"), "not json").unwrap();

        assert!(scan_scoop_inventory(&apps_dir).is_empty());
    }
}
