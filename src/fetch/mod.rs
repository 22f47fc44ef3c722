//! Network side of the pipeline
//!
//! This module contains everything that touches the network:
//! - A concurrency limiter shared by all fetches of a run
//! - Single-URL fetching with deadlines and a body-size bound
//! - Ordered batch fetching over one connection pool

mod batch;
mod fetcher;
mod limiter;

pub use batch::{BatchFetcher, FetchOutcome};
pub use fetcher::{build_http_client, Document, FetchSettings, HttpFetcher};
pub use limiter::{ConcurrencyLimiter, FetchPermit};
