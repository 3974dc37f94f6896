//! Bucket manifest parsing (spec §4.3.3).

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LicenseField {
    Identifier(String),
    Object { identifier: Option<String> },
}

impl LicenseField {
    fn into_string(self) -> Option<String> {
        match self {
            LicenseField::Identifier(s) => Some(s),
            LicenseField::Object { identifier } => identifier,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    license: Option<LicenseField>,
}

/// One bucket manifest, normalized: `license` is always a plain string
/// even when the source JSON held `{"identifier": ..., "url": ...}`
/// (spec §4.3.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoopManifest {
    pub version: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
}

/// Parse one `bucket/*.json` file's contents. Returns `None` if the JSON
/// does not parse or is missing the required `version` field; the caller
/// logs and skips rather than treating this as fatal.
pub fn parse_manifest(bucket_file: &Path, contents: &str) -> Option<ScoopManifest> {
    match serde_json::from_str::<RawManifest>(contents) {
        Ok(raw) => Some(ScoopManifest {
            version: raw.version,
            description: raw.description,
            homepage: raw.homepage,
            license: raw.license.and_then(LicenseField::into_string),
        }),
        Err(error) => {
            tracing::warn!(file = %bucket_file.display(), %error, "skipping unparseable scoop manifest");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_string_license() {
        let json = r#"{"version": "1.0.0", "license": "MIT"}"#;
        let manifest = parse_manifest(Path::new("test.json"), json).unwrap();
        assert_eq!(manifest.license.as_deref(), Some("MIT"));
    }

    #[test]
    fn normalizes_object_license_to_its_identifier() {
        let json = r#"{"version": "1.0.0", "license": {"identifier": "GPL-3.0-only", "url": "https://example.com"}}"#;
        let manifest = parse_manifest(Path::new("test.json"), json).unwrap();
        assert_eq!(manifest.license.as_deref(), Some("GPL-3.0-only"));
    }

    #[test]
    fn missing_version_is_unparseable() {
        let json = r#"{"description": "no version field"}"#;
        assert!(parse_manifest(Path::new("test.json"), json).is_none());
    }
}
