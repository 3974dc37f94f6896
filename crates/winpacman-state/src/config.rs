//! Typed `config.json` (spec §4.8). Deliberately a plain typed struct
//! rather than a free-form map: unrecognized keys from a newer version
//! are ignored on load (serde's default "extra fields are skipped"
//! behavior) and are not round-tripped back out on save, since this
//! layer has no schema-merge machinery to preserve what it doesn't
//! itself model.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use winpacman_model::Manager;

use crate::atomic::write_json_atomically;

/// How often a provider's catalog should be refreshed in the background
/// (spec §4.8 `sync.intervals`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncInterval {
    Daily,
    Weekly,
    OnDemand,
}

impl Default for SyncInterval {
    fn default() -> Self {
        SyncInterval::Daily
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowState {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub maximized: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self { width: 1024, height: 768, x: 100, y: 100, maximized: false }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub window_state: WindowState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub intervals: HashMap<Manager, SyncInterval>,
    /// Per-provider freshness budget in days (spec §4.8 `sync.max_age_days`).
    pub max_age_days: HashMap<Manager, u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let intervals = Manager::CATALOG_PROVIDERS.iter().map(|m| (*m, SyncInterval::Daily)).collect();
        let max_age_days = Manager::CATALOG_PROVIDERS.iter().map(|m| (*m, 1)).collect();
        Self { intervals, max_age_days }
    }
}

/// The NPM/Cargo "popular package" keyword seed list (Open Question (c)):
/// externalized here instead of hardcoded in the provider crates, so an
/// operator can widen or narrow it without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EcosystemKeywordsConfig {
    pub npm_keywords: Vec<String>,
    pub cargo_keywords: Vec<String>,
}

impl Default for EcosystemKeywordsConfig {
    fn default() -> Self {
        Self {
            npm_keywords: DEFAULT_NPM_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            cargo_keywords: DEFAULT_CARGO_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const DEFAULT_NPM_KEYWORDS: &[&str] = &["cli", "framework", "react", "vue", "webpack", "typescript", "testing", "linter"];
const DEFAULT_CARGO_KEYWORDS: &[&str] = &["cli", "async", "web", "parser", "serialization", "networking", "gamedev", "database"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WinpacmanConfig {
    pub ui: UiConfig,
    pub sync: SyncConfig,
    pub verbose_output: bool,
    pub ecosystem_keywords: EcosystemKeywordsConfig,
}

impl WinpacmanConfig {
    /// Load `path`, falling back to defaults if it's missing, unreadable,
    /// or fails to parse. A corrupt config should never stop the
    /// application from starting.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(error) => {
                    warn!(?path, %error, "failed to parse config.json, using defaults");
                    Self::default()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => {
                warn!(?path, %error, "failed to read config.json, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        write_json_atomically(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = WinpacmanConfig::load_or_default(&dir.path().join("config.json"));
        assert!(!config.verbose_output);
        assert_eq!(config.ui.window_state.width, 1024);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults_instead_of_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let config = WinpacmanConfig::load_or_default(&path);
        assert_eq!(config.sync.intervals.len(), Manager::CATALOG_PROVIDERS.len());
    }

    #[test]
    fn unknown_keys_are_ignored_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, br#"{"verbose_output": true, "some_future_field": 42}"#).unwrap();
        let config = WinpacmanConfig::load_or_default(&path);
        assert!(config.verbose_output);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = WinpacmanConfig::default();
        config.verbose_output = true;
        config.sync.intervals.insert(Manager::Npm, SyncInterval::OnDemand);
        config.save(&path).unwrap();

        let loaded = WinpacmanConfig::load_or_default(&path);
        assert!(loaded.verbose_output);
        assert_eq!(loaded.sync.intervals.get(&Manager::Npm), Some(&SyncInterval::OnDemand));
    }
}
