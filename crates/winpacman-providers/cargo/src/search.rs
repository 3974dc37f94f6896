//! Popular-set bulk fetch via the crates.io search API (spec §4.3.5).

use serde::Deserialize;

pub const PAGE_SIZE: u32 = 100;
pub const POPULAR_SET_CAP: usize = 1_000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    crates: Vec<CrateSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CrateSummary {
    pub name: String,
    pub max_version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

pub fn search_url(registry_base: &str, page: u32) -> String {
    format!(
        "{registry_base}/api/v1/crates?sort=downloads&per_page={PAGE_SIZE}&page={page}"
    )
}

pub fn parse_search_response(body: &str) -> Vec<CrateSummary> {
    match serde_json::from_str::<SearchResponse>(body) {
        Ok(response) => response.crates,
        Err(error) => {
            tracing::warn!(%error, "failed to parse crates.io search response");
            Vec::new()
        }
    }
}
