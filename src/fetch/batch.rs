//! Ordered batch fetching
//!
//! Fetches a list of URLs concurrently on the calling task. Every fetch
//! goes through the same limiter, so a batch may be much larger than the
//! limit without oversubscribing the network.

use crate::fetch::fetcher::{build_http_client, Document, FetchSettings, HttpFetcher};
use crate::fetch::limiter::ConcurrencyLimiter;
use crate::FetchError;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

/// Outcome of one slot of a batch
pub type FetchOutcome = Result<Document, FetchError>;

/// Fetches whole batches of URLs, preserving input order
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    settings: FetchSettings,
    fetcher: HttpFetcher,
}

impl BatchFetcher {
    pub fn new(settings: FetchSettings, limiter: ConcurrencyLimiter) -> Self {
        let fetcher = HttpFetcher::new(limiter, settings.max_body_bytes);
        Self { settings, fetcher }
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        self.fetcher.limiter()
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetches every URL and returns one outcome per URL, in input order
    ///
    /// A connection pool is opened for the duration of the call and dropped
    /// when it returns. One failing fetch never cancels its siblings; the
    /// call completes once every fetch has finished or failed.
    pub async fn fetch_all(
        &self,
        urls: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<FetchOutcome> {
        if urls.is_empty() {
            return Vec::new();
        }

        let client = match build_http_client(&self.settings) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Failed to build HTTP client: {}", e);
                let message = e.to_string();
                return urls
                    .into_iter()
                    .map(|url| {
                        Err(FetchError::Client {
                            url,
                            message: message.clone(),
                        })
                    })
                    .collect();
            }
        };

        let total = urls.len();
        let outcomes =
            join_all(urls.iter().map(|url| self.fetcher.fetch(&client, url, cancel))).await;

        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        for error in outcomes.iter().filter_map(|outcome| outcome.as_ref().err()) {
            tracing::debug!("Fetch failed: {}", error);
        }
        tracing::info!("Fetched batch of {} URLs ({} failed)", total, failed);

        outcomes
    }
}
