//! Hive enumeration, Windows-only (spec §4.2).

use winreg::enums::*;
use winreg::RegKey;

use crate::{Hive, RegistryEntry, Result};

const NATIVE_UNINSTALL_PATH: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";
const WOW6432_UNINSTALL_PATH: &str = r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall";

/// Enumerate all three uninstall-key locations (spec §4.2 "three hives").
pub fn scan_all_hives() -> Result<Vec<RegistryEntry>> {
    let mut entries = Vec::new();

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    entries.extend(scan_hive(&hklm, NATIVE_UNINSTALL_PATH, Hive::HklmNative)?);
    entries.extend(scan_hive(&hklm, WOW6432_UNINSTALL_PATH, Hive::HklmWow6432)?);

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    entries.extend(scan_hive(&hkcu, NATIVE_UNINSTALL_PATH, Hive::Hkcu)?);

    Ok(entries)
}

/// A missing uninstall key under a given hive is normal (e.g. no
/// 32-bit apps installed, so `WOW6432Node` never got created) and
/// yields no entries rather than an error.
fn scan_hive(root: &RegKey, path: &str, hive: Hive) -> Result<Vec<RegistryEntry>> {
    let uninstall_key = match root.open_subkey(path) {
        Ok(key) => key,
        Err(_) => return Ok(Vec::new()),
    };

    let mut entries = Vec::new();
    for subkey_name in uninstall_key.enum_keys().filter_map(|k| k.ok()) {
        let Ok(subkey) = uninstall_key.open_subkey(&subkey_name) else {
            continue;
        };

        // Entries without a DisplayName are skipped (spec §4.2).
        let Ok(display_name) = subkey.get_value::<String, _>("DisplayName") else {
            continue;
        };
        if display_name.trim().is_empty() {
            continue;
        }

        entries.push(RegistryEntry {
            subkey_name,
            display_name,
            display_version: read_string(&subkey, "DisplayVersion"),
            publisher: read_string(&subkey, "Publisher"),
            install_location: read_string(&subkey, "InstallLocation"),
            install_path: read_string(&subkey, "InstallPath"),
            install_source: read_string(&subkey, "InstallSource"),
            install_date: read_string(&subkey, "InstallDate"),
            uninstall_string: read_string(&subkey, "UninstallString"),
            install_string: read_string(&subkey, "InstallString"),
            hive,
        });
    }

    Ok(entries)
}

fn read_string(key: &RegKey, name: &str) -> Option<String> {
    key.get_value::<String, _>(name).ok().filter(|s| !s.trim().is_empty())
}
