//! Tag-Harvest: a two-stage concurrent crawl pipeline
//!
//! This crate fetches paginated listing pages, discovers the item links on
//! them, fetches every item and extracts a structured [`Record`] from each.
//! Network fetches run cooperatively on tokio behind a concurrency cap while
//! HTML extraction runs on a bounded rayon worker pool.

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod schedule;
pub mod sites;
pub mod worker;

use std::fmt;
use thiserror::Error;

/// Main error type for run-level failures
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker pool error: {0}")]
    Worker(#[from] WorkerError),

    #[error("All {attempted} {stage} fetches failed")]
    AllFetchesFailed { stage: Stage, attempted: usize },

    #[error("Run cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown site preset: {0}")]
    UnknownPreset(String),
}

/// Failure of a single fetch
///
/// Messages are kept as strings so outcomes can be cloned and compared
/// across runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Response body for {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    #[error("Response body for {url} is not valid UTF-8")]
    Decode { url: String },

    #[error("HTTP client error for {url}: {message}")]
    Client { url: String, message: String },

    #[error("Fetch cancelled for {url}")]
    Cancelled { url: String },
}

impl FetchError {
    /// The URL this fetch was issued for
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Timeout { url }
            | FetchError::Status { url, .. }
            | FetchError::BodyTooLarge { url, .. }
            | FetchError::Decode { url }
            | FetchError::Client { url, .. }
            | FetchError::Cancelled { url } => url,
        }
    }

    /// True when the server could not be reached or answered in time
    ///
    /// A status, size or decode failure means the server did respond.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            FetchError::Transport { .. }
                | FetchError::Timeout { .. }
                | FetchError::Client { .. }
        )
    }
}

/// Extraction failure reported by a site adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("No title element in {url}")]
    MissingTitle { url: String },

    #[error("No timestamp element in {url}")]
    MissingTimestamp { url: String },
}

/// Why a single item produced no record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Worker pool errors
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),

    #[error("Worker pool is not running")]
    NotRunning,

    #[error("Transform panicked on item {index}")]
    JobPanicked { index: usize },
}

/// Pipeline stage that issues fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    Item,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Listing => write!(f, "listing"),
            Stage::Item => write!(f, "item"),
        }
    }
}

/// Result type alias for Tag-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{BatchFetcher, ConcurrencyLimiter, Document, HttpFetcher};
pub use pipeline::{ItemOutcome, Pipeline, Record, RunOutput, RunStats};
pub use schedule::RunScheduler;
pub use sites::{SelectorSite, SiteAdapter, SiteDefinition};
pub use worker::WorkerPool;
