//! Bounded CPU worker pool
//!
//! Extraction work (DOM parsing and traversal) runs here, on dedicated rayon
//! threads, so it never occupies the tokio threads that drive network I/O.
//! The pool is long-lived: it is started once, injected into the pipeline
//! and reused by every scheduled run until it is stopped.

use crate::config::validation::validate_worker_count;
use crate::{ConfigError, WorkerError};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Pool of at most `max_workers` concurrently executing transforms
#[derive(Debug)]
pub struct WorkerPool {
    max_workers: usize,
    pool: Mutex<Option<Arc<rayon::ThreadPool>>>,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Decrements the active count when a job finishes or unwinds
struct ActiveJob<'a>(&'a Counters);

impl<'a> ActiveJob<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let active = counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(active, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerPool {
    /// Default number of worker threads
    pub const DEFAULT_WORKERS: usize = 4;

    /// Creates a stopped pool; call [`WorkerPool::start`] before use
    pub fn new(max_workers: usize) -> Result<Self, ConfigError> {
        validate_worker_count(max_workers)?;

        Ok(Self {
            max_workers,
            pool: Mutex::new(None),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Creates and starts a pool in one step
    pub fn started(max_workers: usize) -> Result<Self, crate::HarvestError> {
        let pool = Self::new(max_workers)?;
        pool.start()?;
        Ok(pool)
    }

    /// Spawns the worker threads; a no-op when already running
    pub fn start(&self) -> Result<(), WorkerError> {
        let mut slot = self.pool.lock().unwrap();
        if slot.is_some() {
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|index| format!("harvest-worker-{}", index))
            .panic_handler(|_| tracing::error!("Extraction job panicked"))
            .build()?;

        tracing::debug!("Started worker pool with {} threads", self.max_workers);
        *slot = Some(Arc::new(pool));
        Ok(())
    }

    /// Releases the worker threads
    ///
    /// Jobs already queued still run to completion; later calls to
    /// [`WorkerPool::run_all`] fail with [`WorkerError::NotRunning`].
    pub fn stop(&self) {
        if self.pool.lock().unwrap().take().is_some() {
            tracing::debug!("Stopped worker pool");
        }
    }

    pub fn is_running(&self) -> bool {
        self.pool.lock().unwrap().is_some()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of transforms executing right now
    pub fn active(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Highest number of transforms that executed at once
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Runs `transform` over every item and returns results in input order
    ///
    /// Items are spread over the worker threads; completion order does not
    /// affect the output order. The pool does not invent per-item values:
    /// failures must be expressed in `R` by the transform itself. If a
    /// transform panics the remaining items still run, then the call fails
    /// with [`WorkerError::JobPanicked`].
    pub async fn run_all<T, R, F>(&self, items: Vec<T>, transform: F) -> Result<Vec<R>, WorkerError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let pool = self
            .pool
            .lock()
            .unwrap()
            .clone()
            .ok_or(WorkerError::NotRunning)?;

        let transform = Arc::new(transform);
        let mut receivers = Vec::with_capacity(items.len());

        for item in items {
            let (tx, rx) = oneshot::channel();
            let transform = Arc::clone(&transform);
            let counters = Arc::clone(&self.counters);

            pool.spawn(move || {
                let _active = ActiveJob::enter(&counters);
                // The receiver is gone only if the caller was dropped
                let _ = tx.send(transform(item));
            });

            receivers.push(rx);
        }

        let results = join_all(receivers).await;

        let mut outputs = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            // A dropped sender means the job unwound before sending
            outputs.push(result.map_err(|_| WorkerError::JobPanicked { index })?);
        }

        Ok(outputs)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
