//! Bounded worker pool with dedicated worker threads.
//!
//! The pool runs at most `worker_count` tasks at any instant. Submission is
//! fire-and-forget: `submit` only enqueues and hands back a [`TaskHandle`]
//! the caller can inspect or wait on.
//!
//! # Cancellation
//!
//! Cancellation is advisory for work that has not started and cooperative for
//! work that has: [`WorkerPool::cancel_pending_and_stop`] refuses new
//! submissions and drops every queued task, while tasks already executing run
//! to completion. Nothing is ever forcibly interrupted.
//!
//! # Example
//!
//! ```rust,ignore
//! use prometheus_concurrent_source::config::WorkerPoolConfig;
//! use prometheus_concurrent_source::core::WorkerPool;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new().with_worker_count(4), my_executor)?;
//! let handle = pool.submit(job)?;
//! handle.wait(Duration::from_secs(60))?;
//! pool.shutdown();
//! ```

mod native;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Identifier assigned to each submitted task, unique within a pool.
pub type TaskId = u64;

/// Errors that can occur when using a `WorkerPool`.
#[derive(Debug)]
pub enum PoolError {
    /// The task queue is full; no more tasks can be accepted.
    QueueFull,

    /// The operation timed out.
    Timeout,

    /// The pool has been shut down or cancelled.
    PoolShutdown,

    /// Configuration validation failed.
    InvalidConfig(String),

    /// Internal error (worker thread could not be spawned, etc.).
    Internal(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "task queue is full"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::PoolShutdown => write!(f, "pool has been shut down"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Metadata the pool attaches to every task it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMetadata {
    /// Unique task identifier.
    pub id: TaskId,
    /// Submission timestamp in milliseconds since epoch.
    pub submitted_at_ms: u128,
}

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for a free worker.
    Pending,
    /// Executing on a worker.
    Running,
    /// Executor returned.
    Finished,
    /// Executor panicked.
    Failed,
    /// Dropped before it started.
    Cancelled,
}

impl TaskState {
    /// Whether the task will never run (again).
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }
}

/// Handle to a submitted task.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    slot: Arc<(Mutex<TaskState>, Condvar)>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            slot: Arc::new((Mutex::new(TaskState::Pending), Condvar::new())),
        }
    }

    /// The task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        *self.slot.0.lock()
    }

    /// Whether the task finished, failed or was cancelled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state().is_done()
    }

    /// Block until the task is done or `timeout` elapses. Uses a Condvar, no polling.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Timeout` if the task is still pending or running
    /// when the timeout elapses.
    pub fn wait(&self, timeout: Duration) -> Result<TaskState, PoolError> {
        let (state, condvar) = self.slot.as_ref();
        let deadline = Instant::now() + timeout;
        let mut guard = state.lock();
        while !guard.is_done() {
            if condvar.wait_until(&mut guard, deadline).timed_out() && !guard.is_done() {
                return Err(PoolError::Timeout);
            }
        }
        Ok(*guard)
    }

    pub(crate) fn set_state(&self, new_state: TaskState) {
        let (state, condvar) = self.slot.as_ref();
        *state.lock() = new_state;
        condvar.notify_all();
    }
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Tasks waiting in the queue.
    pub queued_tasks: u64,

    /// Total tasks whose executor returned.
    pub completed_tasks: u64,

    /// Total tasks whose executor panicked.
    pub failed_tasks: u64,

    /// Total tasks dropped before they started.
    pub cancelled_tasks: u64,

    /// Total tasks submitted.
    pub submitted_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub cancelled_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: self.queued_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            cancelled_tasks: self.cancelled_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
        }
    }
}

/// A task submitted to the worker pool.
#[derive(Debug)]
pub(crate) struct WorkerTask<P> {
    /// The task payload to execute.
    pub payload: P,
    /// Task metadata.
    pub meta: TaskMetadata,
    /// Shared state observed by the submitter.
    pub handle: TaskHandle,
}

pub use native::WorkerPool;
