//! Chocolatey catalog provider (spec §4.3.2).

mod feed;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use tracing::debug;
use winpacman_model::{Manager, PackageRecord, Version};
use winpacman_provider::{CatalogProvider, ProviderError, ProviderStream, Result};

pub use feed::{parse_feed, ChocoEntry, ParsedFeed};

/// Community feed default page size (spec §4.3.2's worked example uses
/// `$skip=9960` as the last page before the 10,000 cutoff, i.e. a page
/// size of 40).
const DEFAULT_PAGE_SIZE: u64 = 40;

/// The feed returns `406 Not Acceptable` at or beyond this `$skip`
/// (spec §4.3.2).
const DEFAULT_SKIP_LIMIT: u64 = 10_000;

/// Self-imposed throttle (spec §4.3.2 "Rate limit: ≤10 req/s").
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(100);

/// Freshness budget from spec §4.5 ("Chocolatey ≤ 7 days").
pub const FRESHNESS_BUDGET: chrono::Duration = chrono::Duration::days(7);

pub struct ChocolateyProvider {
    client: reqwest::Client,
    feed_base: String,
    page_size: u64,
    skip_limit: u64,
}

impl ChocolateyProvider {
    pub fn new(feed_base: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            feed_base: feed_base.into(),
            page_size: DEFAULT_PAGE_SIZE,
            skip_limit: DEFAULT_SKIP_LIMIT,
        }
    }

    /// Override the page size / `$skip` cutoff, for tests that exercise
    /// the skip-to-skiptoken handoff without walking a 10,000-row feed.
    pub fn with_pagination(mut self, page_size: u64, skip_limit: u64) -> Self {
        self.page_size = page_size;
        self.skip_limit = skip_limit;
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

fn entry_to_record(entry: ChocoEntry, now: DateTime<Utc>) -> PackageRecord {
    let name = entry.title.clone().unwrap_or_else(|| entry.package_id.clone());
    let mut record = PackageRecord::new(entry.package_id, name, Version::new(entry.version), Manager::Chocolatey, now);
    record.description = entry.description;
    record.publisher = entry.authors;
    record.homepage = entry.project_url;
    record.license = entry.license_url;
    if let Some(tags) = entry.tags {
        record.tags = tags.split_whitespace().map(str::to_string).collect();
    }
    record.refresh_search_tokens();
    record
}

#[async_trait]
impl CatalogProvider for ChocolateyProvider {
    fn name(&self) -> Manager {
        Manager::Chocolatey
    }

    async fn fetch_all(&self) -> Result<ProviderStream> {
        let client = self.client.clone();
        let feed_base = self.feed_base.clone();
        let page_size = self.page_size;
        let skip_limit = self.skip_limit;

        enum Next {
            Skip(u64),
            Cursor(String),
            Done,
        }

        let pages = stream::unfold((Next::Skip(0), true), move |(state, first)| {
            let client = client.clone();
            let feed_base = feed_base.clone();
            async move {
                if matches!(state, Next::Done) {
                    return None;
                }
                if !first {
                    tokio::time::sleep(RATE_LIMIT_INTERVAL).await;
                }

                let url = match &state {
                    Next::Skip(skip) => format!("{feed_base}/Packages()?$skip={skip}&$top={page_size}"),
                    Next::Cursor(link) => link.clone(),
                    Next::Done => unreachable!(),
                };
                debug!(%url, "fetching chocolatey odata page");

                let body = match fetch_text(&client, &url).await {
                    Ok(body) => body,
                    Err(error) => return Some((vec![Err(error)], (Next::Done, false))),
                };

                let parsed = match parse_feed(&body) {
                    Ok(parsed) => parsed,
                    Err(message) => {
                        let error = ProviderError::Parse {
                            source: "chocolatey odata feed".into(),
                            message,
                        };
                        return Some((vec![Err(error)], (Next::Done, false)));
                    }
                };

                let next_state = match &state {
                    Next::Skip(skip) => {
                        let next_skip = skip + page_size;
                        if next_skip >= skip_limit {
                            parsed.next_link.clone().map(Next::Cursor).unwrap_or(Next::Done)
                        } else {
                            Next::Skip(next_skip)
                        }
                    }
                    Next::Cursor(_) => parsed.next_link.clone().map(Next::Cursor).unwrap_or(Next::Done),
                    Next::Done => Next::Done,
                };

                let now = Utc::now();
                let records = parsed.entries.into_iter().map(|e| Ok(entry_to_record(e, now))).collect();
                Some((records, (next_state, false)))
            }
        });

        let records = pages.flat_map(stream::iter);
        Ok(Box::pin(records))
    }

    async fn fetch_one(&self, package_id: &str) -> Result<Option<PackageRecord>> {
        let url = format!("{}/FindPackagesById()?id='{}'", self.feed_base, urlencoding::encode(package_id));
        let body = fetch_text(&self.client, &url).await?;
        let parsed = parse_feed(&body).map_err(|message| ProviderError::Parse {
            source: "chocolatey odata feed".into(),
            message,
        })?;
        Ok(parsed.entries.into_iter().next().map(|e| entry_to_record(e, Utc::now())))
    }

    fn is_stale(&self, last_sync: Option<DateTime<Utc>>) -> bool {
        match last_sync {
            None => true,
            Some(last) => Utc::now().signed_duration_since(last) > FRESHNESS_BUDGET,
        }
    }

    fn rate_limit_interval(&self) -> Option<Duration> {
        Some(RATE_LIMIT_INTERVAL)
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
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_xml(ids: &[&str], next_link: Option<&str>) -> String {
        let entries: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<entry><title type="text">{id}</title><m:properties><d:Id>{id}</d:Id><d:Version>1.0.0</d:Version></m:properties></entry>"#
                )
            })
            .collect();
        let link = next_link
            .map(|href| format!(r#"<link rel="next" href="{href}" />"#))
            .unwrap_or_default();
        format!(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">{link}{entries}</feed>"#
        )
    }

    #[tokio::test]
    async fn switches_from_skip_to_skiptoken_at_the_configured_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Packages()"))
            .and(query_param("$skip", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_xml(&["a", "b"], None)))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/Packages()"))
            .and(query_param("$skip", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_xml(
                &["c", "d"],
                Some(&format!("{}/cursor-page-1", server.uri())),
            )))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/cursor-page-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_xml(&["e"], None)))
            .mount(&server)
            .await;

        let provider = ChocolateyProvider::new(server.uri()).with_pagination(2, 4);
        let stream = provider.fetch_all().await.unwrap();
        let records: Vec<_> = stream.collect().await;
        let ids: Vec<_> = records
            .into_iter()
            .map(|r| r.unwrap().package_id)
            .collect();

        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
    }
}
