use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque upstream version string, semver-parsed on a best-effort basis.
///
/// Spec §3 requires versions to be "compared lexicographically and
/// semver-parsed where possible" — most package ecosystems in scope here
/// (WinGet, Chocolatey, Scoop) ship versions that aren't valid semver
/// (`"1.2"`, `"2021.11.08"`, `"1.0.0.1"`), so comparison falls back to the
/// raw string whenever either side fails to parse.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parsed: Option<semver::Version>,
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Version::new(raw))
    }
}

impl Version {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = semver::Version::parse(raw.trim_start_matches('v')).ok();
        Self { raw, parsed }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> Option<&semver::Version> {
        self.parsed.as_ref()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => a.cmp(b),
            _ => self.raw.cmp(&other.raw),
        }
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Version::new(value)
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Version::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_versions_compare_numerically() {
        assert!(Version::new("1.9.0") < Version::new("1.10.0"));
    }

    #[test]
    fn non_semver_versions_fall_back_to_lexicographic() {
        // "9" > "10" lexicographically, even though numerically 10 > 9.
        assert!(Version::new("9") > Version::new("10"));
    }

    #[test]
    fn leading_v_is_tolerated_for_semver_parsing() {
        assert!(Version::new("v1.2.3").semver().is_some());
    }

    #[test]
    fn display_preserves_raw_string() {
        assert_eq!(Version::new("1.0.0.1").to_string(), "1.0.0.1");
    }
}
