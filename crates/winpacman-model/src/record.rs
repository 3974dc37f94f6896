use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manager::Manager;
use crate::version::Version;

/// The canonical, normalized package shape used throughout the core (spec
/// §3 "Canonical package record"). Every provider emits these; the cache
/// (`winpacman-cache`) is the only place they are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub package_id: String,
    pub name: String,
    pub version: Version,
    pub manager: Manager,

    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Lowercased whitespace-split union of id + name + description + tags;
    /// always regenerated by [`PackageRecord::refresh_search_tokens`] before
    /// the record is persisted. Never hand-authored.
    #[serde(default)]
    pub search_tokens: String,

    #[serde(default)]
    pub is_installed: bool,
    #[serde(default)]
    pub installed_version: Option<String>,
    #[serde(default)]
    pub install_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub install_source: Option<Manager>,
    #[serde(default)]
    pub install_location: Option<PathBuf>,

    pub last_seen_at: DateTime<Utc>,
}

impl PackageRecord {
    /// Construct a not-yet-installed catalog record with `search_tokens`
    /// already populated.
    pub fn new(
        package_id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<Version>,
        manager: Manager,
        last_seen_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            package_id: package_id.into(),
            name: name.into(),
            version: version.into(),
            manager,
            description: None,
            publisher: None,
            homepage: None,
            license: None,
            tags: BTreeSet::new(),
            search_tokens: String::new(),
            is_installed: false,
            installed_version: None,
            install_date: None,
            install_source: None,
            install_location: None,
            last_seen_at,
        };
        record.refresh_search_tokens();
        record
    }

    /// Regenerate `search_tokens` from the current field values. The cache
    /// calls this on every upsert (spec §3 invariant: "it is regenerated on
    /// every upsert and must contain the lowercased `package_id` and
    /// `name`").
    pub fn refresh_search_tokens(&mut self) {
        let mut tokens: BTreeSet<String> = BTreeSet::new();
        tokens.extend(tokenize(&self.package_id));
        tokens.extend(tokenize(&self.name));
        if let Some(desc) = &self.description {
            tokens.extend(tokenize(desc));
        }
        for tag in &self.tags {
            tokens.extend(tokenize(tag));
        }
        self.search_tokens = tokens.into_iter().collect::<Vec<_>>().join(" ");
    }

    /// Clear installed-state fields. Called at the start of each inventory
    /// scan (spec §3 Lifecycle: "Installed-state flags are cleared at the
    /// start of each inventory scan").
    pub fn clear_installed_state(&mut self) {
        self.is_installed = false;
        self.installed_version = None;
        self.install_date = None;
        self.install_source = None;
        self.install_location = None;
    }

    /// Checks the invariant from spec §8: "for every `is_installed=1` row,
    /// `installed_version` is non-null; for every `is_installed=0` row, the
    /// installed-state fields are null."
    pub fn installed_state_is_consistent(&self) -> bool {
        if self.is_installed {
            self.installed_version.is_some()
        } else {
            self.installed_version.is_none()
                && self.install_date.is_none()
                && self.install_source.is_none()
                && self.install_location.is_none()
        }
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn search_tokens_contain_id_and_name() {
        let record = PackageRecord::new(
            "Microsoft.VisualStudioCode",
            "Visual Studio Code",
            "1.94.0",
            Manager::Winget,
            now(),
        );
        assert!(record
            .search_tokens
            .contains(&"microsoft.visualstudiocode".to_string()));
        assert!(record.search_tokens.contains("visual"));
        assert!(record.search_tokens.contains("studio"));
        assert!(record.search_tokens.contains("code"));
    }

    #[test]
    fn fresh_record_has_consistent_installed_state() {
        let record = PackageRecord::new("vlc", "VLC", "3.0.0", Manager::Winget, now());
        assert!(record.installed_state_is_consistent());
    }

    #[test]
    fn clearing_installed_state_restores_consistency() {
        let mut record = PackageRecord::new("vlc", "VLC", "3.0.0", Manager::Winget, now());
        record.is_installed = true;
        record.installed_version = Some("3.0.0".into());
        record.install_source = Some(Manager::Winget);
        assert!(record.installed_state_is_consistent());

        record.clear_installed_state();
        assert!(record.installed_state_is_consistent());
        assert!(!record.is_installed);
    }
}
