//! Task execution trait for the worker pool.

use async_trait::async_trait;

use crate::core::worker_pool::TaskMetadata;

/// Executor run by every worker of a [`WorkerPool`](crate::core::WorkerPool).
///
/// Each worker owns a clone and calls `execute` from its dedicated thread,
/// inside that thread's single-threaded tokio runtime, so blocking work never
/// stalls the caller's runtime.
///
/// Executors report results through their own channels; the pool only tracks
/// whether a task finished. A panicking executor marks its task failed and the
/// worker keeps serving the queue.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_concurrent_source::core::{TaskMetadata, WorkerExecutor};
///
/// #[derive(Clone)]
/// struct Echo(crossbeam_channel::Sender<String>);
///
/// #[async_trait]
/// impl WorkerExecutor<String> for Echo {
///     async fn execute(&self, payload: String, _meta: TaskMetadata) {
///         let _ = self.0.send(payload);
///     }
/// }
/// ```
#[async_trait]
pub trait WorkerExecutor<P>: Send + Sync + Clone + 'static
where
    P: Send + 'static,
{
    /// Execute a task payload.
    async fn execute(&self, payload: P, meta: TaskMetadata);
}
