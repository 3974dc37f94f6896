//! npm catalog provider (spec §4.3.4).
//!
//! Deliberately lazy: `fetch_all` never mirrors the full registry, only a
//! bounded "popular" set assembled from keyword searches; `fetch_one`
//! resolves a specific package on demand.

mod registry;
mod search;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream;
use tracing::debug;
use winpacman_model::{Manager, PackageRecord, Version};
use winpacman_provider::{CatalogProvider, ProviderError, ProviderStream, Result};

pub use search::DEFAULT_KEYWORDS;

/// Upper bound on the popular set (spec §4.3.4 "~1,000 records").
const POPULAR_SET_CAP: usize = 1_000;

pub struct NpmProvider {
    client: reqwest::Client,
    registry_base: String,
    keywords: Vec<String>,
}

impl NpmProvider {
    pub fn new(registry_base: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            registry_base: registry_base.into(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
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

fn package_to_record(package: search::SearchPackage, now: DateTime<Utc>) -> PackageRecord {
    let mut record = PackageRecord::new(package.name.clone(), package.name, Version::new(package.version), Manager::Npm, now);
    record.description = package.description;
    record.homepage = package.links.and_then(|l| l.homepage);
    record.publisher = package.publisher.and_then(|p| p.username);
    record.license = package.license;
    record.tags = package.keywords.into_iter().collect();
    record.refresh_search_tokens();
    record
}

#[async_trait]
impl CatalogProvider for NpmProvider {
    fn name(&self) -> Manager {
        Manager::Npm
    }

    async fn fetch_all(&self) -> Result<ProviderStream> {
        let mut seen = std::collections::HashSet::new();
        let mut records = Vec::new();

        for keyword in &self.keywords {
            if records.len() >= POPULAR_SET_CAP {
                break;
            }
            let url = search::search_url(&self.registry_base, keyword, search::PAGE_SIZE);
            debug!(%url, "searching npm registry for popular set");
            let body = fetch_text(&self.client, &url).await?;
            let now = Utc::now();
            for package in search::parse_search_response(&body) {
                if !seen.insert(package.name.clone()) {
                    continue;
                }
                records.push(Ok(package_to_record(package, now)));
                if records.len() >= POPULAR_SET_CAP {
                    break;
                }
            }
        }

        Ok(Box::pin(stream::iter(records)))
    }

    async fn fetch_one(&self, package_id: &str) -> Result<Option<PackageRecord>> {
        let url = registry::registry_url(&self.registry_base, package_id);
        let body = match fetch_text(&self.client, &url).await {
            Ok(body) => body,
            Err(ProviderError::Network(_)) => return Ok(None),
            Err(other) => return Err(other),
        };

        let doc = registry::parse_package_doc(&body).map_err(|e| ProviderError::Parse {
            source: "npm registry package document".into(),
            message: e.to_string(),
        })?;

        let Some(version_doc) = doc.versions.get(&doc.dist_tags.latest) else {
            return Ok(None);
        };

        let mut record = PackageRecord::new(
            doc.name.clone(),
            doc.name.clone(),
            Version::new(doc.dist_tags.latest.clone()),
            Manager::Npm,
            Utc::now(),
        );
        record.description = version_doc.description.clone();
        record.homepage = version_doc.homepage.clone();
        record.license = version_doc.license.as_ref().and_then(registry::normalize_license);
        record.tags = version_doc.keywords.iter().cloned().collect();
        record.refresh_search_tokens();
        Ok(Some(record))
    }

    fn is_stale(&self, _last_sync: Option<DateTime<Utc>>) -> bool {
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

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_all_dedupes_across_keyword_searches() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "objects": [
                {"package": {"name": "left-pad", "version": "1.3.0", "description": "pad a string", "keywords": ["string"]}},
            ]
        })
        .to_string();

        Mock::given(method("GET"))
            .and(path("/-/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = NpmProvider::new(server.uri()).with_keywords(vec!["cli".into(), "string".into()]);
        let records: Vec<_> = provider.fetch_all().await.unwrap().collect().await;
        let ids: Vec<_> = records.into_iter().map(|r| r.unwrap().package_id).collect();

        assert_eq!(ids, vec!["left-pad"]);
    }

    #[tokio::test]
    async fn fetch_one_resolves_the_latest_dist_tag() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "name": "left-pad",
            "dist-tags": {"latest": "1.3.0"},
            "versions": {
                "1.3.0": {"description": "pad a string", "license": "MIT", "keywords": ["string"]}
            }
        })
        .to_string();

        Mock::given(method("GET"))
            .and(path("/left-pad"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = NpmProvider::new(server.uri());
        let record = provider.fetch_one("left-pad").await.unwrap().unwrap();

        assert_eq!(record.version.as_str(), "1.3.0");
        assert_eq!(record.license.as_deref(), Some("MIT"));
    }
}
