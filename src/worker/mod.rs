//! CPU-bound worker pool used for HTML extraction

mod pool;

pub use pool::WorkerPool;
