//! Best-effort manager fingerprint from Registry path substrings (spec
//! §4.3.6 "Registry inventory").

use winpacman_model::Manager;

/// Guess which package manager owns a Registry entry from its
/// `InstallSource`/`InstallLocation` values. This is only a fingerprint:
/// `winpacman-resolver` cross-validates it against manager-owned
/// evidence before trusting it.
pub fn fingerprint_from_paths(install_source: Option<&str>, install_location: Option<&str>) -> Manager {
    if let Some(source) = install_source {
        let lower = source.to_lowercase();
        if lower.contains("winget") || lower.contains("appinstaller") {
            return Manager::Winget;
        }
        if lower.contains("chocolatey") || lower.contains("choco") {
            return Manager::Chocolatey;
        }
    }

    if let Some(location) = install_location {
        let lower = location.to_lowercase();
        if lower.contains("scoop") {
            return Manager::Scoop;
        }
        if location.contains("WindowsApps") {
            return Manager::Msstore;
        }
    }

    Manager::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winget_source_is_recognized() {
        assert_eq!(
            fingerprint_from_paths(Some("Microsoft.DesktopAppInstaller"), None),
            Manager::Winget
        );
    }

    #[test]
    fn chocolatey_source_is_recognized() {
        assert_eq!(
            fingerprint_from_paths(Some("Chocolatey Software"), None),
            Manager::Chocolatey
        );
    }

    #[test]
    fn scoop_location_is_recognized() {
        assert_eq!(
            fingerprint_from_paths(None, Some(r"C:\Users\me\scoop\apps\vim\current")),
            Manager::Scoop
        );
    }

    #[test]
    fn windows_apps_location_is_msstore() {
        assert_eq!(
            fingerprint_from_paths(None, Some(r"C:\Program Files\WindowsApps\Foo_1.0")),
            Manager::Msstore
        );
    }

    #[test]
    fn no_evidence_is_unknown() {
        assert_eq!(fingerprint_from_paths(None, None), Manager::Unknown);
    }

    #[test]
    fn unrelated_source_is_unknown() {
        assert_eq!(fingerprint_from_paths(Some("Some Vendor Inc."), None), Manager::Unknown);
    }
}
