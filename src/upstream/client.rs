//! HTTP client for the SWAPI REST endpoints

use super::PageSource;
use crate::config::UpstreamConfig;
use crate::error::parse_retry_after;
use crate::{metrics, HolonetError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::Value;
use std::time::Instant;
use swapi::{Collection, Envelope};
use tracing::{debug, warn};

/// SWAPI client
pub struct SwapiClient {
    client: Client,
    base_url: String,
}

impl SwapiClient {
    /// Create a new client
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static(concat!("holonet/", env!("CARGO_PKG_VERSION"))),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| HolonetError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a collection page; page 1 is the bare collection URL
    pub fn page_url(&self, collection: Collection, page: u32) -> String {
        if page <= 1 {
            format!("{}/{}/", self.base_url, collection.key())
        } else {
            format!("{}/{}/?page={}", self.base_url, collection.key(), page)
        }
    }

    pub fn entity_url(&self, collection: Collection, id: &str) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url,
            collection.key(),
            urlencoding::encode(id)
        )
    }

    /// Issue a GET and classify the HTTP outcome
    ///
    /// `Ok(None)` means 404.
    async fn get(&self, collection: Collection, url: &str) -> Result<Option<Response>> {
        let started = Instant::now();
        debug!(url = %url, "Fetching from upstream");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream_request(
                    collection.key(),
                    "error",
                    started.elapsed().as_secs_f64(),
                );
                return Err(HolonetError::UpstreamUnavailable(format!(
                    "GET {} failed: {}",
                    url, e
                )));
            }
        };

        let status = response.status();
        let outcome = match status {
            s if s.is_success() => "ok",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            _ => "error",
        };
        metrics::record_upstream_request(collection.key(), outcome, started.elapsed().as_secs_f64());

        match status {
            s if s.is_success() => Ok(Some(response)),
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(
                    response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                warn!(url = %url, retry_after = retry_after, "Upstream rate limited");
                Err(HolonetError::RateLimited(retry_after))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(HolonetError::UpstreamUnavailable(format!(
                    "GET {}: HTTP {}: {}",
                    url,
                    status,
                    body.chars().take(200).collect::<String>()
                )))
            }
        }
    }
}

/// Read a response body as JSON, mapping every failure to `UpstreamMalformed`
async fn read_json(url: &str, response: Response) -> Result<Value> {
    let body = response.text().await.map_err(|e| {
        HolonetError::UpstreamUnavailable(format!("Failed to read body of {}: {}", url, e))
    })?;
    serde_json::from_str(&body)
        .map_err(|e| HolonetError::UpstreamMalformed(format!("{} is not JSON: {}", url, e)))
}

#[async_trait]
impl PageSource for SwapiClient {
    async fn fetch_page(&self, collection: Collection, page: u32) -> Result<Envelope<Value>> {
        if page == 0 {
            return Err(HolonetError::InvalidArgument(
                "upstream pages are numbered from 1".to_string(),
            ));
        }

        let url = self.page_url(collection, page);
        let response = self
            .get(collection, &url)
            .await?
            .ok_or_else(|| HolonetError::NotFound(format!("{} page {}", collection, page)))?;

        let body = read_json(&url, response).await?;
        serde_json::from_value(body).map_err(|e| {
            HolonetError::UpstreamMalformed(format!("{} is not a list envelope: {}", url, e))
        })
    }

    async fn fetch_entity(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let url = self.entity_url(collection, id);
        let Some(response) = self.get(collection, &url).await? else {
            return Ok(None);
        };

        match read_json(&url, response).await? {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            body @ Value::Object(_) => Ok(Some(body)),
            other => Err(HolonetError::UpstreamMalformed(format!(
                "{} returned {} instead of an object",
                url, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SwapiClient {
        SwapiClient::new(&UpstreamConfig {
            base_url: "https://swapi.dev/api/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(client().base_url(), "https://swapi.dev/api");
    }

    #[test]
    fn test_page_urls() {
        let client = client();
        assert_eq!(
            client.page_url(Collection::Films, 1),
            "https://swapi.dev/api/films/"
        );
        assert_eq!(
            client.page_url(Collection::People, 4),
            "https://swapi.dev/api/people/?page=4"
        );
    }

    #[test]
    fn test_entity_url_is_encoded() {
        let client = client();
        assert_eq!(
            client.entity_url(Collection::Planets, "1"),
            "https://swapi.dev/api/planets/1/"
        );
        assert_eq!(
            client.entity_url(Collection::Planets, "a/b"),
            "https://swapi.dev/api/planets/a%2Fb/"
        );
    }

    #[tokio::test]
    async fn test_page_zero_rejected() {
        let result = client().fetch_page(Collection::Films, 0).await;
        assert!(matches!(result, Err(HolonetError::InvalidArgument(_))));
    }
}
