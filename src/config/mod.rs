//! Configuration models for the sync scheduler and its worker pool.

pub mod source;
pub mod worker_pool;

pub use source::ConcurrentSourceConfig;
pub use worker_pool::WorkerPoolConfig;
