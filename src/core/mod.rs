//! Core scheduling: queue items, worker pool, tasks and the sync driver.

pub mod driver;
pub mod error;
pub mod executor;
pub mod queue_item;
pub mod slice_logger;
pub mod tasks;
pub mod timing;
pub mod worker_pool;

pub use driver::{RunSummary, SyncRun};
pub use error::{AppResult, SyncError};
pub use executor::WorkerExecutor;
pub use queue_item::{GenerationCompleted, PartitionCompleted, PartitionId, QueueItem, Record};
pub use slice_logger::SliceLogger;
pub use tasks::{PartitionEnqueuer, PartitionReader, SyncTask, SyncTaskExecutor};
pub use timing::MultiEventTimer;
pub use worker_pool::{PoolError, PoolStats, TaskHandle, TaskId, TaskMetadata, TaskState, WorkerPool};
