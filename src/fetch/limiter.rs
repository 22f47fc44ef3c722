//! Global fetch concurrency cap
//!
//! A counting semaphore shared by every fetch of a run. Permits are RAII
//! guards, so a slot is returned on every exit path of the holder,
//! including errors and cancellation.

use crate::config::validation::validate_fetch_limit;
use crate::ConfigError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of simultaneous network fetches
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// A granted fetch slot; dropping it releases the slot
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyLimiter {
    /// Default number of concurrent fetches
    pub const DEFAULT_LIMIT: usize = 10;

    /// Creates a limiter allowing `limit` concurrent holders
    ///
    /// # Returns
    ///
    /// * `Ok(ConcurrencyLimiter)` - Limiter with `limit` permits
    /// * `Err(ConfigError)` - `limit` is zero or above 100
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        validate_fetch_limit(limit)?;

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Waits until fewer than `limit` permits are held, then grants one
    pub async fn acquire(&self) -> FetchPermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore is never closed");

        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);

        FetchPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        }
    }

    /// Configured maximum number of concurrent holders
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of permits currently held
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at once since creation or the last reset
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn reset_peak(&self) {
        self.counters.peak.store(self.active(), Ordering::SeqCst);
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(Self::DEFAULT_LIMIT)),
            limit: Self::DEFAULT_LIMIT,
            counters: Arc::new(Counters::default()),
        }
    }
}
