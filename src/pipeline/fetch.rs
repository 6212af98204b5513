//! Page loading: fetch the source page until its article region exists.
//!
//! ## Why poll?
//!
//! The source site fills its `<article>` after the initial page load, so a
//! single load can come back with only a skeleton. The fetcher reloads at a
//! fixed interval until the article shows up, and gives up with
//! [`RelayError::FetchTimeout`] after a bounded number of loads instead of
//! tying up a worker forever.
//!
//! [`PageSource`] is the seam: [`HttpFetcher`] is the `reqwest`
//! implementation, and tests (or a headless-browser backend) plug in their
//! own.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::pipeline::document::contains_article;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Raw markup of a page whose article region has materialised.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the page was requested from.
    pub url: String,
    /// Unmodified response body.
    pub body: Vec<u8>,
}

/// Anything that can load a source page.
///
/// Implementations return only once the article region is present, or fail.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, RelayError>;
}

/// [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    poll_interval: Duration,
    max_attempts: u32,
}

impl HttpFetcher {
    /// Build a fetcher from the relay configuration.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            poll_interval: config.poll_interval(),
            max_attempts: config.max_poll_attempts.max(1),
        })
    }

    /// One page load. Any non-success status is a failure.
    async fn load_once(&self, url: &str) -> Result<Vec<u8>, RelayError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RelayError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| RelayError::FetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, RelayError> {
        let start = Instant::now();
        info!("Fetching {}", url);

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                sleep(self.poll_interval).await;
            }

            let body = self.load_once(url).await?;
            if contains_article(&body) {
                debug!(
                    "Article present at {} after {} load(s), {:?}",
                    url,
                    attempt,
                    start.elapsed()
                );
                return Ok(FetchedPage {
                    url: url.to_string(),
                    body,
                });
            }

            debug!(
                "No article at {} yet (load {}/{})",
                url, attempt, self.max_attempts
            );
        }

        warn!(
            "Gave up waiting for an article at {} after {} loads",
            url, self.max_attempts
        );
        Err(RelayError::FetchTimeout {
            url: url.to_string(),
            attempts: self.max_attempts,
        })
    }
}
