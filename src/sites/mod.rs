//! Site adapters
//!
//! A [`SiteAdapter`] holds everything that is specific to one target site:
//! which listing pages to start from, how to find item links on them and
//! how to turn an item page into a [`Record`]. Adapters never perform I/O,
//! which keeps them testable without a network.
//!
//! [`SelectorSite`] is a data-driven adapter compiled from a
//! [`SiteDefinition`] of CSS selectors; [`presets`] provides ready-made
//! definitions for known sites.

pub mod presets;
mod selector;

pub use selector::{resolve_link, SelectorSite, SiteDefinition};

use crate::fetch::Document;
use crate::pipeline::Record;
use crate::ExtractError;

/// Site-specific extraction rules consumed by the pipeline
///
/// Implementations are shared between worker threads, so every method takes
/// `&self` and must be cheap to call concurrently.
pub trait SiteAdapter: Send + Sync + 'static {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Listing pages to start a run from
    fn seed_urls(&self) -> Vec<String>;

    /// Item URLs found on a listing page, in document order
    fn extract_links(&self, document: &Document) -> Vec<String>;

    /// Parses an item page
    ///
    /// Malformed-but-present HTML yields an [`ExtractError`], never a panic.
    fn extract_record(&self, document: &Document) -> Result<Record, ExtractError>;
}
