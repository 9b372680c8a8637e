//! HTTP fetching for the crawl loop.
//!
//! The traversal only talks to the [`Fetcher`] trait; [`HttpFetcher`] is the
//! reqwest-backed implementation with a fixed timeout and bounded retries.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument, warn};

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;

/// A successfully fetched resource
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// URL that was requested
    pub url: String,

    /// HTTP status code (always 2xx)
    pub status: u16,

    /// Declared `Content-Type`, lower-cased, empty when absent
    pub content_type: String,

    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchedResource {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Source of crawl responses
pub trait Fetcher {
    /// Fetch one URL. Non-2xx responses are errors.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedResource, CrawlError>> + Send;
}

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: CrawlerConfig,
}

impl HttpFetcher {
    /// Build the client with the configured timeout and user agent
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedResource, CrawlError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();
        let body = response.bytes().await?.to_vec();

        Ok(FetchedResource {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedResource, CrawlError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(resource) => return Ok(resource),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = self.config.retry_backoff(attempt);
                    warn!(
                        "Transient failure for {} ({}), retry {}/{} in {:?}",
                        url, e, attempt, self.config.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    debug!("Giving up on {} after {} retries", url, attempt);
                    return Err(e);
                }
            }
        }
    }
}
