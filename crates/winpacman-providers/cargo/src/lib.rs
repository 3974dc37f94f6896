//! crates.io catalog provider (spec §4.3.5).
//!
//! `fetch_one` resolves a single crate through the sparse index
//! protocol (one NDJSON file per crate, at a prefix-derived URL);
//! `fetch_all` assembles a bounded "popular" set via the crates.io
//! search API, mirroring the npm provider's lazy shape.

mod search;
mod sparse_index;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream;
use tracing::debug;
use winpacman_model::{Manager, PackageRecord, Version};
use winpacman_provider::{CatalogProvider, ProviderError, ProviderStream, Result};

pub use search::{CrateSummary, POPULAR_SET_CAP};
pub use sparse_index::{index_path, parse_index_file, IndexLine};

pub struct CargoProvider {
    client: reqwest::Client,
    index_base: String,
    registry_api_base: String,
}

impl CargoProvider {
    pub fn new(index_base: impl Into<String>, registry_api_base: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            index_base: index_base.into(),
            registry_api_base: registry_api_base.into(),
        }
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(format!("winpacman/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(60))
        .build()
        .expect("failed to build HTTP client")
}

fn summary_to_record(summary: CrateSummary, now: DateTime<Utc>) -> PackageRecord {
    let mut record = PackageRecord::new(
        summary.name.clone(),
        summary.name,
        Version::new(summary.max_version),
        Manager::Cargo,
        now,
    );
    record.description = summary.description;
    record.homepage = summary.homepage.or(summary.repository);
    record.refresh_search_tokens();
    record
}

fn index_line_to_record(name: &str, line: IndexLine, now: DateTime<Utc>) -> PackageRecord {
    let mut record = PackageRecord::new(name, name, Version::new(line.vers), Manager::Cargo, now);
    record.description = line.description;
    record.license = line.license;
    record.homepage = line.homepage;
    record.tags = line.keywords.into_iter().collect();
    record.refresh_search_tokens();
    record
}

#[async_trait]
impl CatalogProvider for CargoProvider {
    fn name(&self) -> Manager {
        Manager::Cargo
    }

    async fn fetch_all(&self) -> Result<ProviderStream> {
        let mut seen = std::collections::HashSet::new();
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            if records.len() >= POPULAR_SET_CAP {
                break;
            }
            let url = search::search_url(&self.registry_api_base, page);
            debug!(%url, "searching crates.io for popular set");
            let body = fetch_text(&self.client, &url).await?;
            let now = Utc::now();
            let page_summaries = search::parse_search_response(&body);
            if page_summaries.is_empty() {
                break;
            }
            let page_len = page_summaries.len();

            for summary in page_summaries {
                if !seen.insert(summary.name.clone()) {
                    continue;
                }
                records.push(Ok(summary_to_record(summary, now)));
                if records.len() >= POPULAR_SET_CAP {
                    break;
                }
            }

            if page_len < search::PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        Ok(Box::pin(stream::iter(records)))
    }

    async fn fetch_one(&self, package_id: &str) -> Result<Option<PackageRecord>> {
        let path = index_path(package_id);
        if path.is_empty() {
            return Ok(None);
        }
        let url = format!("{}/{}", self.index_base.trim_end_matches('/'), path);
        let body = match fetch_text(&self.client, &url).await {
            Ok(body) => body,
            Err(ProviderError::Network(_)) => return Ok(None),
            Err(other) => return Err(other),
        };

        let lines = parse_index_file(&body);
        // The sparse index is append-only within a file; the last
        // non-yanked line is the highest version (spec §4.3.5 "the
        // highest non-yanked version becomes `version`").
        let Some(latest) = lines.into_iter().last() else {
            return Ok(None);
        };
        Ok(Some(index_line_to_record(package_id, latest, Utc::now())))
    }

    fn is_stale(&self, _last_sync: Option<DateTime<Utc>>) -> bool {
        // Cargo is fetched on demand only, never auto-synced (spec §4.5
        // "NPM/Cargo on demand only (never auto)") — the orchestrator
        // never calls `refresh_one` for it without `force=true`, so the
        // reported staleness value is moot but reported honestly.
        true
    }
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?
        .error_for_status()
        .map_err(|e| ProviderError::Network(e.to_string()))?;
    response.text().await.map_err(|e| ProviderError::Network(e.to_string()))
}
