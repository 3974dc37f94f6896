//! On-demand package detail via `registry.npmjs.org/<name>` (spec §4.3.4).

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct PackageDoc {
    pub name: String,
    #[serde(rename = "dist-tags")]
    pub dist_tags: DistTags,
    pub versions: HashMap<String, VersionDoc>,
}

#[derive(Debug, Deserialize)]
pub struct DistTags {
    pub latest: String,
}

#[derive(Debug, Deserialize)]
pub struct VersionDoc {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub license: Option<serde_json::Value>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

pub fn registry_url(registry_base: &str, package_name: &str) -> String {
    format!("{registry_base}/{}", urlencoding::encode(package_name))
}

/// npm's `license` field is historically either a plain string or, in
/// older packages, an object like `{"type": "MIT", "url": ...}`. Extract
/// a plain string either way.
pub fn normalize_license(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map.get("type").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

pub fn parse_package_doc(body: &str) -> Result<PackageDoc, serde_json::Error> {
    serde_json::from_str(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_string_license() {
        let value = serde_json::json!("MIT");
        assert_eq!(normalize_license(&value).as_deref(), Some("MIT"));
    }

    #[test]
    fn normalizes_object_license() {
        let value = serde_json::json!({"type": "ISC", "url": "https://example.com"});
        assert_eq!(normalize_license(&value).as_deref(), Some("ISC"));
    }
}
