//! Pipeline orchestrator - drives one complete run
//!
//! A run moves through four sequential stages:
//! 1. Seed: listing URLs from the site adapter
//! 2. ListingFetch: every listing page, concurrently
//! 3. LinkExtract: item links from each listing page, on the worker pool
//! 4. ItemFetch + RecordExtract: every item page, then one record per item
//!
//! Nothing is carried over between runs.

use crate::config::Config;
use crate::fetch::{BatchFetcher, ConcurrencyLimiter, FetchOutcome, FetchSettings};
use crate::pipeline::types::{ItemOutcome, RunOutput, RunStats};
use crate::sites::SiteAdapter;
use crate::worker::WorkerPool;
use crate::{ConfigError, HarvestError, ItemError, Stage};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Generic two-stage crawl pipeline for one site
pub struct Pipeline {
    adapter: Arc<dyn SiteAdapter>,
    fetcher: BatchFetcher,
    pool: Arc<WorkerPool>,
}

impl Pipeline {
    /// Creates a pipeline from its parts
    ///
    /// The worker pool is shared and outlives individual runs; it must be
    /// started before [`Pipeline::run`] is called.
    pub fn new(
        adapter: Arc<dyn SiteAdapter>,
        fetcher: BatchFetcher,
        pool: Arc<WorkerPool>,
    ) -> Self {
        Self {
            adapter,
            fetcher,
            pool,
        }
    }

    /// Creates a pipeline using the fetch limit and settings of `config`
    pub fn from_config(
        config: &Config,
        adapter: Arc<dyn SiteAdapter>,
        pool: Arc<WorkerPool>,
    ) -> Result<Self, ConfigError> {
        let limiter = ConcurrencyLimiter::new(config.pipeline.fetch_limit)?;
        let fetcher = BatchFetcher::new(FetchSettings::from_config(config), limiter);
        Ok(Self::new(adapter, fetcher, pool))
    }

    pub fn adapter(&self) -> &dyn SiteAdapter {
        self.adapter.as_ref()
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        self.fetcher.limiter()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Runs the pipeline once
    ///
    /// # Returns
    ///
    /// * `Ok(RunOutput)` - One outcome per discovered link, in discovery
    ///   order; failed items are kept as failed outcomes
    /// * `Err(HarvestError::AllFetchesFailed)` - No fetch of a non-empty
    ///   stage reached its server
    /// * `Err(HarvestError::Cancelled)` - `cancel` fired during the run
    /// * `Err(HarvestError::Worker)` - The pool is stopped or a transform panicked
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutput, HarvestError> {
        let started = Instant::now();
        let site = self.adapter.name().to_string();

        // Seed
        let seeds = self.adapter.seed_urls();
        let mut stats = RunStats {
            seeds: seeds.len(),
            ..RunStats::default()
        };
        if seeds.is_empty() {
            tracing::info!("{}: no seed URLs, nothing to do", site);
            return Ok(RunOutput::default());
        }
        ensure_active(cancel)?;

        // ListingFetch
        tracing::debug!("{}: fetching {} listing pages", site, seeds.len());
        let listings = self.fetcher.fetch_all(seeds, cancel).await;
        ensure_active(cancel)?;
        stats.seed_failures = count_failures(&listings);
        ensure_reachable(Stage::Listing, &listings)?;

        // LinkExtract
        let adapter = Arc::clone(&self.adapter);
        let links_per_listing = self
            .pool
            .run_all(listings, move |listing| match listing {
                Ok(document) => adapter.extract_links(&document),
                Err(_) => Vec::new(),
            })
            .await?;
        let links: Vec<String> = links_per_listing.into_iter().flatten().collect();
        stats.links = links.len();
        tracing::debug!("{}: discovered {} item links", site, links.len());

        if links.is_empty() {
            tracing::info!("{}: listing pages contained no item links", site);
            return Ok(RunOutput {
                outcomes: Vec::new(),
                stats,
            });
        }
        ensure_active(cancel)?;

        // ItemFetch
        let items = self.fetcher.fetch_all(links.clone(), cancel).await;
        ensure_active(cancel)?;
        stats.fetch_failures = count_failures(&items);
        ensure_reachable(Stage::Item, &items)?;

        // RecordExtract
        let adapter = Arc::clone(&self.adapter);
        let paired: Vec<(String, FetchOutcome)> = links.into_iter().zip(items).collect();
        let outcomes = self
            .pool
            .run_all(paired, move |(url, fetched)| {
                let result = fetched.map_err(ItemError::from).and_then(|document| {
                    adapter.extract_record(&document).map_err(ItemError::from)
                });
                ItemOutcome { url, result }
            })
            .await?;

        for outcome in &outcomes {
            if let Err(ItemError::Extract(e)) = &outcome.result {
                tracing::debug!("{}: {}", site, e);
                stats.extract_failures += 1;
            }
        }

        tracing::info!(
            "{}: run finished in {:?}: {} links, {} records, \
             {} fetch failures, {} extract failures",
            site,
            started.elapsed(),
            stats.links,
            stats.records(),
            stats.fetch_failures,
            stats.extract_failures
        );

        Ok(RunOutput { outcomes, stats })
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<(), HarvestError> {
    if cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }
    Ok(())
}

fn count_failures(outcomes: &[FetchOutcome]) -> usize {
    outcomes.iter().filter(|outcome| outcome.is_err()).count()
}

/// A stage where no server could be reached points at lost connectivity,
/// not at individual bad URLs. Error statuses still count as reachable.
fn ensure_reachable(stage: Stage, outcomes: &[FetchOutcome]) -> Result<(), HarvestError> {
    let unreachable = outcomes
        .iter()
        .all(|outcome| matches!(outcome, Err(e) if e.is_connection_failure()));
    if !outcomes.is_empty() && unreachable {
        tracing::warn!("All {} {} fetches failed", outcomes.len(), stage);
        return Err(HarvestError::AllFetchesFailed {
            stage,
            attempted: outcomes.len(),
        });
    }
    Ok(())
}
