//! HTTP fetcher implementation
//!
//! This module handles a single GET request of the pipeline:
//! - Building HTTP clients with proper user agent strings and deadlines
//! - Holding a limiter permit from send until the body is fully read
//! - Enforcing a response-size bound while streaming the body
//! - Error classification

use crate::config::{Config, FetchConfig, UserAgentConfig};
use crate::fetch::limiter::ConcurrencyLimiter;
use crate::FetchError;
use reqwest::{redirect::Policy, Client, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Raw body of a fetched page together with the URL it was served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Final URL after redirects
    pub url: String,

    /// Page body decoded as UTF-8
    pub body: String,
}

/// Client-level settings shared by every fetch of a batch
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_body_bytes: usize,
}

impl FetchSettings {
    pub fn new(user_agent: &UserAgentConfig, fetch: &FetchConfig) -> Self {
        Self {
            user_agent: user_agent.header_value(),
            request_timeout: fetch.request_timeout(),
            connect_timeout: fetch.connect_timeout(),
            max_body_bytes: fetch.max_body_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.user_agent, &config.fetch)
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        let fetch = FetchConfig::default();
        Self {
            user_agent: concat!("TagHarvest/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: fetch.request_timeout(),
            connect_timeout: fetch.connect_timeout(),
            max_body_bytes: fetch.max_body_bytes,
        }
    }
}

/// Builds an HTTP client for one batch
///
/// The request timeout covers the whole exchange, body included, so it
/// doubles as the per-fetch deadline.
pub fn build_http_client(settings: &FetchSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs single fetches under the shared concurrency cap
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    limiter: ConcurrencyLimiter,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(limiter: ConcurrencyLimiter, max_body_bytes: usize) -> Self {
        Self {
            limiter,
            max_body_bytes,
        }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Fetches `url` and returns its body
    ///
    /// # Request Flow
    ///
    /// 1. Wait for a limiter permit
    /// 2. Send the GET request
    /// 3. Reject non-2xx statuses
    /// 4. Stream the body, failing once it exceeds `max_body_bytes`
    /// 5. Decode as UTF-8 and release the permit
    ///
    /// Cancelling `cancel` aborts at any point, including while waiting for
    /// a permit; the permit is released either way. No retries are made.
    pub async fn fetch(
        &self,
        client: &Client,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Document, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),
            result = self.fetch_with_permit(client, url) => result,
        }
    }

    async fn fetch_with_permit(&self, client: &Client, url: &str) -> Result<Document, FetchError> {
        let _permit = self.limiter.acquire().await;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = self.read_body(url, response).await?;

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(Document {
            url: final_url,
            body,
        })
    }

    async fn read_body(&self, url: &str, mut response: Response) -> Result<String, FetchError> {
        let too_large = || FetchError::BodyTooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(too_large());
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(url, e))? {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        String::from_utf8(bytes).map_err(|_| FetchError::Decode {
            url: url.to_string(),
        })
    }
}

/// Maps a transport error onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
