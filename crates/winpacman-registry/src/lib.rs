//! Windows Registry Scanner (spec §4.2).
//!
//! Enumerates the Windows "Uninstall" keys across three hives and turns
//! them into [`RegistryEntry`] values, then runs the install-path
//! extraction heuristics and manager-fingerprint guess that
//! `winpacman-resolver` (C7) later cross-validates. Grounded on
//! `vx_system_pm::resolver::SystemDependencyResolver::check_vcredist_installed`'s
//! use of `winreg::RegKey::predef(HKEY_LOCAL_MACHINE)` plus
//! `open_subkey`/`enum_keys`/`get_value`, generalized from "does one app
//! exist" to "enumerate every uninstall entry in three hives".

mod fingerprint;
mod path_extract;
mod scoop_inventory;

#[cfg(windows)]
mod scan;

use std::path::PathBuf;

use winpacman_model::Manager;

pub use fingerprint::fingerprint_from_paths;
pub use path_extract::{extract_install_path, score_candidate, MatchCandidate};
pub use scoop_inventory::{scan_scoop_inventory, ScoopInventoryEntry};

/// One raw Uninstall-key entry, before path extraction or fingerprinting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub subkey_name: String,
    pub display_name: String,
    pub display_version: Option<String>,
    pub publisher: Option<String>,
    pub install_location: Option<String>,
    /// Rarer sibling of `InstallLocation` some installers write instead
    /// (spec §4.2 step 2); not one of the always-present raw fields.
    pub install_path: Option<String>,
    pub install_source: Option<String>,
    pub install_date: Option<String>,
    pub uninstall_string: Option<String>,
    pub install_string: Option<String>,
    pub hive: Hive,
}

/// Which of the three uninstall-key locations an entry was read from
/// (spec §4.2 "three hives").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hive {
    HklmNative,
    HklmWow6432,
    Hkcu,
}

impl RegistryEntry {
    /// Run the full install-path extraction pipeline (spec §4.2 steps
    /// 1-4) against this entry.
    pub fn resolved_install_path(&self) -> Option<PathBuf> {
        extract_install_path(self)
    }

    /// Best-effort manager attribution from path substrings (spec §4.3.6).
    pub fn fingerprint(&self) -> Manager {
        fingerprint_from_paths(self.install_source.as_deref(), self.install_location.as_deref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry access failed: {0}")]
    Access(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Enumerate the three uninstall-key hives and return every entry that
/// has a `DisplayName` (spec §4.2 "Entries without a `DisplayName` are
/// skipped"). On non-Windows this returns an empty list without error
/// (spec §8 "Registry scan on a machine with 0 registered apps returns
/// an empty stream without error" — generalized here to "not Windows at
/// all" for cross-platform builds of the core).
#[cfg(windows)]
pub fn scan() -> Result<Vec<RegistryEntry>> {
    scan::scan_all_hives()
}

#[cfg(not(windows))]
pub fn scan() -> Result<Vec<RegistryEntry>> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(display_name: &str) -> RegistryEntry {
        RegistryEntry {
            subkey_name: "Test_Key".into(),
            display_name: display_name.into(),
            display_version: Some("1.0.0".into()),
            publisher: None,
            install_location: None,
            install_path: None,
            install_source: None,
            install_date: None,
            uninstall_string: None,
            install_string: None,
            hive: Hive::HklmNative,
        }
    }

    #[test]
    fn fingerprint_defaults_to_unknown() {
        assert_eq!(entry("Foo").fingerprint(), Manager::Unknown);
    }

    #[test]
    fn no_install_location_yields_no_path() {
        assert_eq!(entry("Foo").resolved_install_path(), None);
    }
}
