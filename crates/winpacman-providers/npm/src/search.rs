//! Popular-set discovery via the npm search endpoint (spec §4.3.4).

use serde::Deserialize;

/// Keyword list used to build the bounded "popular" set. Externalized as
/// a default here; `winpacman-state` config may override it.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "cli", "framework", "react", "webpack", "typescript", "testing", "bundler", "linter", "build-tool", "server",
];

/// Maximum records returned per keyword search request.
pub const PAGE_SIZE: u32 = 250;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    objects: Vec<SearchObject>,
}

#[derive(Debug, Deserialize)]
struct SearchObject {
    package: SearchPackage,
}

#[derive(Debug, Deserialize)]
pub struct SearchPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub links: Option<SearchLinks>,
    pub publisher: Option<SearchPublisher>,
    #[serde(default)]
    pub license: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchLinks {
    pub homepage: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchPublisher {
    pub username: Option<String>,
}

pub fn search_url(registry_base: &str, keyword: &str, size: u32) -> String {
    format!("{registry_base}/-/v1/search?text={}&size={size}", urlencoding::encode(keyword))
}

/// Parse a search response body into its packages, ignoring entries that
/// fail to deserialize (a malformed individual object should not drop
/// the rest of the page).
pub fn parse_search_response(body: &str) -> Vec<SearchPackage> {
    match serde_json::from_str::<SearchResponse>(body) {
        Ok(response) => response.objects.into_iter().map(|o| o.package).collect(),
        Err(error) => {
            tracing::warn!(%error, "failed to parse npm search response");
            Vec::new()
        }
    }
}
