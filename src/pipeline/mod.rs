//! Crawl pipeline: seed pages → links → item pages → records
//!
//! The [`Pipeline`] composes the batch fetcher and the worker pool into a
//! deterministic multi-stage run. Output order always follows discovery
//! order, and a failed item never removes its slot from the output.

mod orchestrator;
mod types;

pub use orchestrator::Pipeline;
pub use types::{ItemOutcome, Record, RunOutput, RunStats};
