//! Install-path extraction and confidence-scored matching (spec §4.2).

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::RegistryEntry;

/// Captures the directory portion of an `UninstallString`/`InstallString`
/// like `"C:\Program Files\Vim\vim91\uninstall.exe" /S`: an optional
/// leading quote, a drive letter, and everything up to the last
/// backslash before the trailing `*.exe` (spec §4.2 step 3).
static EXE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^"?([A-Za-z]:\\.+)\\[^\\"]+\.exe"#).unwrap());

/// Version or architecture subdirectory token (spec §4.2 step 4).
static VERSION_OR_ARCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(v?\d+(\.\d+)*|bin|app|x\d{2,3}|win\d+|install|uninstall)$").unwrap());

/// A version-only identifier like `4.7.1`, rejected outright by the
/// confidence matcher (spec §4.2).
static VERSION_ONLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)*$").unwrap());

/// Run the four-step install-path heuristic against one Registry entry.
pub fn extract_install_path(entry: &RegistryEntry) -> Option<PathBuf> {
    if let Some(location) = &entry.install_location {
        let candidate = PathBuf::from(location);
        if candidate.is_dir() {
            return Some(apply_smart_parent(candidate));
        }
    }

    if let Some(install_path) = &entry.install_path {
        let candidate = PathBuf::from(install_path);
        if candidate.is_dir() {
            return Some(apply_smart_parent(candidate));
        }
    }

    for raw in [&entry.uninstall_string, &entry.install_string].into_iter().flatten() {
        if let Some(dir) = parse_dir_from_exe_string(raw) {
            if dir.is_dir() {
                return Some(apply_smart_parent(dir));
            }
        }
    }

    None
}

fn parse_dir_from_exe_string(raw: &str) -> Option<PathBuf> {
    EXE_PATH_RE.captures(raw.trim()).map(|caps| PathBuf::from(&caps[1]))
}

/// Smart parent selection (spec §4.2 step 4): walk up exactly one level
/// when the final path segment looks like a version or architecture
/// token, so `...\Vim\vim91` resolves to `...\Vim`.
fn apply_smart_parent(dir: PathBuf) -> PathBuf {
    let is_version_or_arch = dir
        .file_name()
        .and_then(|s| s.to_str())
        .map(|segment| VERSION_OR_ARCH_RE.is_match(segment))
        .unwrap_or(false);

    if is_version_or_arch {
        if let Some(parent) = dir.parent() {
            return parent.to_path_buf();
        }
    }
    dir
}

/// The subset of a [`RegistryEntry`] the confidence matcher needs.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub subkey_name: String,
    pub display_name: String,
    pub install_location: Option<String>,
}

impl From<&RegistryEntry> for MatchCandidate {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            subkey_name: entry.subkey_name.clone(),
            display_name: entry.display_name.clone(),
            install_location: entry.install_location.clone(),
        }
    }
}

/// Score a candidate Registry entry against a WinGet `(package_id,
/// package_name)` pair (spec §4.2 "confidence-scored matching"). Returns
/// `None` below the minimum-accept threshold of 70, or when `package_id`
/// is a bare version string.
pub fn score_candidate(package_id: &str, package_name: &str, candidate: &MatchCandidate) -> Option<u32> {
    const MIN_ACCEPT: u32 = 70;

    if VERSION_ONLY_RE.is_match(package_id.trim()) {
        return None;
    }

    let normalized_id = normalize(package_id);
    let normalized_name = normalize(package_name);
    let normalized_display = normalize(&candidate.display_name);

    let mut score = if candidate.subkey_name.eq_ignore_ascii_case(package_id) {
        150
    } else if candidate.display_name.eq_ignore_ascii_case(package_name) {
        145
    } else if normalized_display == normalized_id || normalized_display == normalized_name {
        125
    } else if !normalized_display.is_empty()
        && (normalized_display.contains(&normalized_id)
            || normalized_display.contains(&normalized_name)
            || normalized_id.contains(&normalized_display))
    {
        95
    } else {
        0
    };

    if score == 0 {
        return None;
    }

    if let Some(location) = &candidate.install_location {
        if !normalized_name.is_empty() && normalize(location).contains(&normalized_name) {
            score += 8;
        }
    }

    if score >= MIN_ACCEPT {
        Some(score)
    } else {
        None
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_parent_walks_up_one_level_for_version_dir() {
        let root = tempfile::tempdir().unwrap();
        let app_root = root.path().join("Vim");
        let versioned = app_root.join("vim91");
        std::fs::create_dir_all(&versioned).unwrap();

        let entry = RegistryEntry {
            subkey_name: "Vim".into(),
            display_name: "Vim 9.1".into(),
            display_version: Some("9.1".into()),
            publisher: None,
            install_location: Some(versioned.to_string_lossy().into_owned()),
            install_path: None,
            install_source: None,
            install_date: None,
            uninstall_string: None,
            install_string: None,
            hive: crate::Hive::HklmNative,
        };

        assert_eq!(extract_install_path(&entry), Some(app_root));
    }

    #[test]
    fn smart_parent_does_not_walk_up_twice() {
        let root = tempfile::tempdir().unwrap();
        let program_files = root.path().join("Program Files");
        std::fs::create_dir_all(&program_files).unwrap();

        let entry = RegistryEntry {
            subkey_name: "x".into(),
            display_name: "x".into(),
            display_version: None,
            publisher: None,
            install_location: Some(program_files.to_string_lossy().into_owned()),
            install_path: None,
            install_source: None,
            install_date: None,
            uninstall_string: None,
            install_string: None,
            hive: crate::Hive::HklmNative,
        };

        // "Program Files" itself doesn't match the version/arch token
        // regex, so it is returned unchanged.
        assert_eq!(extract_install_path(&entry), Some(program_files));
    }

    #[test]
    fn parses_directory_from_quoted_uninstall_string() {
        let root = tempfile::tempdir().unwrap();
        let app_dir = root.path().join("Neo Cowsay");
        std::fs::create_dir_all(&app_dir).unwrap();
        let uninstall_string = format!(r#""{}\uninstall.exe" /S"#, app_dir.to_string_lossy());

        let entry = RegistryEntry {
            subkey_name: "neocowsay".into(),
            display_name: "Neo Cowsay".into(),
            display_version: Some("1.0.0".into()),
            publisher: None,
            install_location: None,
            install_path: None,
            install_source: None,
            install_date: None,
            uninstall_string: Some(uninstall_string),
            install_string: None,
            hive: crate::Hive::HklmNative,
        };

        assert_eq!(extract_install_path(&entry), Some(app_dir));
    }

    #[test]
    fn exact_subkey_match_scores_150() {
        let candidate = MatchCandidate {
            subkey_name: "Vim.Vim".into(),
            display_name: "Vim 9.1 (x64)".into(),
            install_location: None,
        };
        assert_eq!(score_candidate("Vim.Vim", "Vim", &candidate), Some(150));
    }

    #[test]
    fn version_only_id_is_rejected() {
        let candidate = MatchCandidate {
            subkey_name: "4.7.1".into(),
            display_name: "4.7.1".into(),
            install_location: None,
        };
        assert_eq!(score_candidate("4.7.1", "Something", &candidate), None);
    }

    #[test]
    fn substring_match_gets_install_location_bonus() {
        let candidate = MatchCandidate {
            subkey_name: "{GUID-1234}".into(),
            display_name: "Neo Cowsay CLI".into(),
            install_location: Some(r"C:\Program Files\NeoCowsay".into()),
        };
        let score = score_candidate("neocowsay", "Neo Cowsay", &candidate).unwrap();
        assert!(score >= 95 + 5);
    }

    #[test]
    fn unrelated_candidate_is_below_threshold() {
        let candidate = MatchCandidate {
            subkey_name: "{GUID-9999}".into(),
            display_name: "Totally Unrelated App".into(),
            install_location: None,
        };
        assert_eq!(score_candidate("neocowsay", "Neo Cowsay", &candidate), None);
    }
}
