//! Repeated pipeline runs
//!
//! The pipeline itself runs once and keeps no state. [`RunScheduler`] sits
//! outside it and:
//! - Starts a new run every `interval` after a successful one
//! - Backs off exponentially while runs fail as a whole (every fetch of a
//!   stage failed), which usually means connectivity is gone
//! - Stops on cancellation, after `max_runs`, or on any other run error

mod backoff;

pub use backoff::Backoff;

use crate::config::ScheduleConfig;
use crate::pipeline::{Pipeline, RunOutput};
use crate::HarvestError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drives a pipeline on a timer
#[derive(Debug, Clone)]
pub struct RunScheduler {
    interval: Duration,
    backoff: Backoff,
}

impl RunScheduler {
    pub fn new(config: &ScheduleConfig) -> Self {
        Self::with_timings(
            Duration::from_secs(config.interval_secs),
            Duration::from_secs(config.initial_backoff_secs),
            Duration::from_secs(config.max_backoff_secs),
        )
    }

    pub fn with_timings(
        interval: Duration,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            interval,
            backoff: Backoff::new(initial_backoff, max_backoff),
        }
    }

    /// Runs `pipeline` repeatedly, handing every successful output to `on_output`
    ///
    /// # Returns
    ///
    /// * `Ok(runs)` - Number of runs attempted before cancellation or `max_runs`
    /// * `Err(HarvestError)` - A run failed for a reason other than lost
    ///   connectivity (e.g. the worker pool was stopped), or the last run
    ///   allowed by `max_runs` lost every fetch
    pub async fn run<F>(
        &mut self,
        pipeline: &Pipeline,
        cancel: &CancellationToken,
        max_runs: Option<u32>,
        mut on_output: F,
    ) -> Result<u32, HarvestError>
    where
        F: FnMut(RunOutput),
    {
        let mut runs = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Ok(runs);
            }

            let delay = match pipeline.run(cancel).await {
                Ok(output) => {
                    runs += 1;
                    on_output(output);
                    self.backoff.reset();
                    self.interval
                }
                Err(HarvestError::AllFetchesFailed { stage, attempted }) => {
                    runs += 1;
                    if max_runs.is_some_and(|max| runs >= max) {
                        return Err(HarvestError::AllFetchesFailed { stage, attempted });
                    }
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        "Run {} lost all {} {} fetches, retrying in {:?}",
                        runs,
                        attempted,
                        stage,
                        delay
                    );
                    delay
                }
                Err(HarvestError::Cancelled) => return Ok(runs),
                Err(e) => return Err(e),
            };

            if max_runs.is_some_and(|max| runs >= max) {
                return Ok(runs);
            }

            tracing::debug!("Next run in {:?}", delay);
            tokio::select! {
                _ = cancel.cancelled() => return Ok(runs),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
