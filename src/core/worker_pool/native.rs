//! Native implementation of `WorkerPool` using OS threads.
//!
//! This implementation spawns dedicated OS threads that each have their own
//! single-threaded tokio runtime. This ensures blocking discovery and read
//! work does not stall the caller.
//!
//! # Design Principles
//!
//! - **No polling**: Workers block on channel recv; handles use Condvar
//! - **Clean shutdown**: Dropping the sender unblocks workers naturally
//! - **Prompt cancellation**: The pool keeps a receiver so it can drain
//!   not-yet-started tasks itself instead of waiting for a free worker

use std::io;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::WorkerPoolConfig;
use crate::core::executor::WorkerExecutor;
use crate::util::clock::now_ms;

use super::{PoolCounters, PoolError, PoolStats, TaskHandle, TaskMetadata, TaskState, WorkerTask};

/// How long `shutdown` waits for each worker to exit before detaching it.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Flags shared between the pool and its workers.
#[derive(Debug, Default)]
struct Lifecycle {
    /// No new submissions are accepted.
    shutdown: AtomicBool,
    /// Queued tasks are dropped instead of executed.
    cancelled: AtomicBool,
}

/// Worker pool with dedicated OS threads.
///
/// At most `worker_count` tasks execute at any instant; extra submissions wait
/// in a FIFO channel.
pub struct WorkerPool<P, E>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<WorkerTask<P>>>>,

    /// Receiver kept by the pool to drain pending tasks on cancellation.
    task_rx: Receiver<WorkerTask<P>>,

    /// Pool statistics counters (lock-free atomics).
    counters: Arc<PoolCounters>,

    /// Shutdown and cancellation flags.
    lifecycle: Arc<Lifecycle>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Task ID counter (lock-free atomic).
    task_id_counter: AtomicU64,

    /// Phantom data for executor type.
    _executor: PhantomData<E>,
}

impl<P, E> WorkerPool<P, E>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    /// Create a new worker pool with the given configuration and executor.
    ///
    /// This spawns `config.worker_count` OS threads, each with its own
    /// single-threaded tokio runtime for executing tasks.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid and
    /// `PoolError::Internal` if a worker thread cannot be spawned.
    pub fn new(config: WorkerPoolConfig, executor: E) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = match config.max_queue_depth {
            Some(depth) => bounded::<WorkerTask<P>>(depth),
            None => unbounded::<WorkerTask<P>>(),
        };
        let counters = Arc::new(PoolCounters::default());
        let lifecycle = Arc::new(Lifecycle::default());

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let spawned = spawn_worker(
                worker_id,
                &config,
                task_rx.clone(),
                Arc::clone(&counters),
                Arc::clone(&lifecycle),
                executor.clone(),
            );
            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Workers already spawned exit once the sender is gone.
                    lifecycle.shutdown.store(true, Ordering::Release);
                    drop(task_tx);
                    return Err(PoolError::Internal(format!(
                        "failed to spawn worker thread {worker_id}: {e}"
                    )));
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            max_queue_depth = ?config.max_queue_depth,
            "WorkerPool initialized with dedicated OS threads"
        );

        Ok(Self {
            config,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            counters,
            lifecycle,
            workers: Mutex::new(workers),
            task_id_counter: AtomicU64::new(0),
            _executor: PhantomData,
        })
    }

    /// Submit a task.
    ///
    /// The enqueue itself is non-blocking: the task runs as soon as a worker
    /// is free and the returned handle tracks it.
    ///
    /// # Errors
    ///
    /// - `PoolError::QueueFull` if a bounded task queue is full
    /// - `PoolError::PoolShutdown` if the pool has been shut down or cancelled
    pub fn submit(&self, payload: P) -> Result<TaskHandle, PoolError> {
        if self.lifecycle.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown);
        }

        let task_id = self.task_id_counter.fetch_add(1, Ordering::Relaxed);
        let handle = TaskHandle::new(task_id);
        let task = WorkerTask {
            payload,
            meta: TaskMetadata {
                id: task_id,
                submitted_at_ms: now_ms(),
            },
            handle: handle.clone(),
        };

        // Get sender (brief lock)
        let task_tx_guard = self.task_tx.lock();
        let Some(task_tx) = task_tx_guard.as_ref() else {
            return Err(PoolError::PoolShutdown);
        };

        // Count before sending so a fast worker never decrements first.
        self.counters.queued_tasks.fetch_add(1, Ordering::Relaxed);
        match task_tx.try_send(task) {
            Ok(()) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = task_id, "Task submitted to worker pool");
                Ok(handle)
            }
            Err(TrySendError::Full(_)) => {
                self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                warn!("Worker pool queue is full");
                Err(PoolError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                Err(PoolError::PoolShutdown)
            }
        }
    }

    /// Stop accepting work and drop every task that has not started.
    ///
    /// Returns immediately: tasks already executing keep running and their
    /// workers exit afterwards. Returns the number of tasks cancelled by this
    /// call.
    pub fn cancel_pending_and_stop(&self) -> usize {
        self.lifecycle.cancelled.store(true, Ordering::Release);
        if !self.lifecycle.shutdown.swap(true, Ordering::AcqRel) {
            *self.task_tx.lock() = None;
        }

        let mut cancelled = 0;
        while let Ok(task) = self.task_rx.try_recv() {
            self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
            self.counters.cancelled_tasks.fetch_add(1, Ordering::Relaxed);
            task.handle.set_state(TaskState::Cancelled);
            cancelled += 1;
        }

        info!(
            cancelled = cancelled,
            active = self.counters.active_tasks.load(Ordering::Relaxed),
            "Worker pool cancelled pending tasks"
        );
        cancelled
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Shut down the pool gracefully.
    ///
    /// Queued tasks still run; the sender is dropped so idle workers exit, and
    /// each worker is joined with a bounded wait. Workers that don't exit in
    /// time are detached to prevent hangs.
    pub fn shutdown(&self) {
        if self.lifecycle.shutdown.swap(true, Ordering::AcqRel) && self.workers.lock().is_empty() {
            return;
        }

        info!("Shutting down worker pool");

        // Drop the sender to unblock all workers waiting on recv()
        *self.task_tx.lock() = None;

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            // Join on a helper thread so a stuck worker cannot hang shutdown.
            let (tx, rx) = crossbeam_channel::bounded(1);
            let join_thread = thread::spawn(move || {
                let result = worker.join();
                let _ = tx.send(result.is_ok());
            });

            match rx.recv_timeout(WORKER_JOIN_TIMEOUT) {
                Ok(true) => {
                    debug!(worker_id = idx, "Worker joined successfully");
                    let _ = join_thread.join();
                }
                Ok(false) => {
                    warn!(worker_id = idx, "Worker panicked");
                    let _ = join_thread.join();
                }
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                }
            }
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
    }
}

impl<P, E> Drop for WorkerPool<P, E>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    fn drop(&mut self) {
        // Cancel pending work but DON'T join workers in Drop: a running task
        // may be blocked on I/O and the owner should not hang on it.
        if !self.lifecycle.cancelled.load(Ordering::Acquire) && !self.workers.lock().is_empty() {
            let cancelled = self.cancel_pending_and_stop();
            debug!(
                cancelled = cancelled,
                "WorkerPool dropped without explicit shutdown - workers will be detached"
            );
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker<P, E>(
    worker_id: usize,
    config: &WorkerPoolConfig,
    task_rx: Receiver<WorkerTask<P>>,
    counters: Arc<PoolCounters>,
    lifecycle: Arc<Lifecycle>,
    executor: E,
) -> io::Result<JoinHandle<()>>
where
    P: Send + 'static,
    E: WorkerExecutor<P>,
{
    thread::Builder::new()
        .name(format!("{}-{worker_id}", config.thread_name_prefix))
        .stack_size(config.thread_stack_size)
        .spawn(move || {
            debug!(worker_id = worker_id, "Worker thread started");

            // Each worker has its own single-threaded tokio runtime
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(
                        worker_id = worker_id,
                        error = %e,
                        "Failed to create worker runtime"
                    );
                    return;
                }
            };

            // Worker loop - blocking recv, NO POLLING.
            // When the sender is dropped and the queue is empty, recv returns Err.
            while let Ok(task) = task_rx.recv() {
                let WorkerTask {
                    payload,
                    meta,
                    handle,
                } = task;
                counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);

                if lifecycle.cancelled.load(Ordering::Acquire) {
                    counters.cancelled_tasks.fetch_add(1, Ordering::Relaxed);
                    handle.set_state(TaskState::Cancelled);
                    debug!(worker_id = worker_id, task_id = meta.id, "Dropping cancelled task");
                    continue;
                }

                counters.active_tasks.fetch_add(1, Ordering::Relaxed);
                handle.set_state(TaskState::Running);
                let task_id = meta.id;

                debug!(worker_id = worker_id, task_id = task_id, "Worker executing task");

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    rt.block_on(executor.execute(payload, meta));
                }));

                counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
                if outcome.is_ok() {
                    counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                    handle.set_state(TaskState::Finished);
                    debug!(worker_id = worker_id, task_id = task_id, "Worker completed task");
                } else {
                    counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                    handle.set_state(TaskState::Failed);
                    error!(worker_id = worker_id, task_id = task_id, "Executor panicked");
                }
            }

            debug!(worker_id = worker_id, "Worker thread exiting");
        })
}
