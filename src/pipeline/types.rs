//! Pipeline data types

use crate::ItemError;

/// Structured output extracted from one item page
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    /// Identifier of the site the record came from
    pub source: String,
    pub title: String,
    pub timestamp: String,
    pub body: String,
}

impl Record {
    /// The sentinel record with every field empty
    ///
    /// Stands in for a failed item so that record batches keep one entry per
    /// link.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
            && self.title.is_empty()
            && self.timestamp.is_empty()
            && self.body.is_empty()
    }

    /// Fields in column order: source, title, timestamp, body
    pub fn fields(&self) -> [&str; 4] {
        [
            self.source.as_str(),
            self.title.as_str(),
            self.timestamp.as_str(),
            self.body.as_str(),
        ]
    }
}

/// What happened to one discovered link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// The link as discovered on the listing page
    pub url: String,
    pub result: Result<Record, ItemError>,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The extracted record, or the sentinel for a failed item
    pub fn record(&self) -> Record {
        self.result.clone().unwrap_or_default()
    }

    pub fn into_record(self) -> Record {
        self.result.unwrap_or_default()
    }
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub seeds: usize,
    pub seed_failures: usize,
    pub links: usize,
    pub fetch_failures: usize,
    pub extract_failures: usize,
}

impl RunStats {
    pub fn records(&self) -> usize {
        self.links - self.fetch_failures - self.extract_failures
    }
}

/// Result of one complete pipeline run
///
/// Holds exactly one outcome per discovered link, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub outcomes: Vec<ItemOutcome>,
    pub stats: RunStats,
}

impl RunOutput {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Record batch with sentinels at the positions of failed items
    pub fn records(&self) -> Vec<Record> {
        self.outcomes.iter().map(ItemOutcome::record).collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.outcomes
            .into_iter()
            .map(ItemOutcome::into_record)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }
}
