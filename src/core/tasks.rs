//! Partition generation and reading tasks.
//!
//! Both tasks talk to the driver only through the coordination queue. On
//! success each pushes its items followed by exactly one completion sentinel;
//! on failure (error or panic) it pushes one [`QueueItem::Error`] and no
//! sentinel. A closed queue means the run is over, so tasks stop quietly.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_channel::Sender;
use tracing::{debug, trace};

use crate::core::executor::WorkerExecutor;
use crate::core::queue_item::{
    GenerationCompleted, PartitionCompleted, PartitionId, QueueItem, Record,
};
use crate::core::worker_pool::TaskMetadata;
use crate::core::{AppResult, SyncError};
use crate::source::{Partition, Stream};

/// Work the driver hands to the pool.
pub enum SyncTask {
    /// Discover a stream's partitions.
    GeneratePartitions(Arc<dyn Stream>),
    /// Read one registered partition.
    ReadPartition {
        /// Arena identity assigned by the driver.
        id: PartitionId,
        /// The partition to read.
        partition: Arc<dyn Partition>,
    },
}

/// Outcome of pushing onto the coordination queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Push {
    Delivered,
    Closed,
}

fn push(queue: &Sender<QueueItem>, item: QueueItem) -> Push {
    match queue.send(item) {
        Ok(()) => Push::Delivered,
        Err(rejected) => {
            debug!(kind = rejected.0.kind(), "Coordination queue closed, dropping item");
            Push::Closed
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

/// Runs a stream's discovery and enqueues what it finds.
#[derive(Clone)]
pub struct PartitionEnqueuer {
    queue: Sender<QueueItem>,
}

impl PartitionEnqueuer {
    /// Create an enqueuer pushing onto `queue`.
    #[must_use]
    pub const fn new(queue: Sender<QueueItem>) -> Self {
        Self { queue }
    }

    /// Push every discovered partition, then `GenerationCompleted`.
    pub fn generate_partitions(&self, stream: &dyn Stream) {
        let stream_name = stream.name().to_owned();
        debug!(stream = %stream_name, "Generating partitions");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.enqueue_all(stream)));
        let item = match outcome {
            Ok(Ok(Push::Delivered)) => {
                QueueItem::GenerationCompleted(GenerationCompleted { stream: stream_name })
            }
            Ok(Ok(Push::Closed)) => return,
            Ok(Err(source)) => QueueItem::Error(SyncError::PartitionGeneration {
                stream: stream_name,
                source,
            }),
            Err(payload) => QueueItem::Error(SyncError::TaskPanicked {
                task: format!("partition generation for stream `{stream_name}`"),
                message: panic_message(payload.as_ref()),
            }),
        };
        push(&self.queue, item);
    }

    fn enqueue_all(&self, stream: &dyn Stream) -> AppResult<Push> {
        for partition in stream.generate_partitions()? {
            if push(&self.queue, QueueItem::Partition(partition?)) == Push::Closed {
                return Ok(Push::Closed);
            }
        }
        Ok(Push::Delivered)
    }
}

/// Reads one partition and enqueues its records.
#[derive(Clone)]
pub struct PartitionReader {
    queue: Sender<QueueItem>,
}

impl PartitionReader {
    /// Create a reader pushing onto `queue`.
    #[must_use]
    pub const fn new(queue: Sender<QueueItem>) -> Self {
        Self { queue }
    }

    /// Push every record of `partition`, then `PartitionCompleted`.
    pub fn process_partition(&self, id: PartitionId, partition: &dyn Partition) {
        let stream_name: Arc<str> = Arc::from(partition.stream_name());
        trace!(stream = %stream_name, partition = ?partition, "Reading partition");

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.enqueue_all(id, &stream_name, partition)));
        let item = match outcome {
            Ok(Ok(Push::Delivered)) => {
                QueueItem::PartitionCompleted(PartitionCompleted { partition: id })
            }
            Ok(Ok(Push::Closed)) => return,
            Ok(Err(source)) => QueueItem::Error(SyncError::PartitionRead {
                stream: stream_name.to_string(),
                partition: format!("{partition:?}"),
                source,
            }),
            Err(payload) => QueueItem::Error(SyncError::TaskPanicked {
                task: format!("reading {partition:?} of stream `{stream_name}`"),
                message: panic_message(payload.as_ref()),
            }),
        };
        push(&self.queue, item);
    }

    fn enqueue_all(
        &self,
        id: PartitionId,
        stream_name: &Arc<str>,
        partition: &dyn Partition,
    ) -> AppResult<Push> {
        for data in partition.read()? {
            let record = Record::new(id, Arc::clone(stream_name), data?);
            if push(&self.queue, QueueItem::Record(record)) == Push::Closed {
                return Ok(Push::Closed);
            }
        }
        Ok(Push::Delivered)
    }
}

/// Executor dispatching [`SyncTask`]s to the generation and reading tasks.
#[derive(Clone)]
pub struct SyncTaskExecutor {
    enqueuer: PartitionEnqueuer,
    reader: PartitionReader,
}

impl SyncTaskExecutor {
    /// Create an executor whose tasks push onto `queue`.
    #[must_use]
    pub fn new(queue: Sender<QueueItem>) -> Self {
        Self {
            enqueuer: PartitionEnqueuer::new(queue.clone()),
            reader: PartitionReader::new(queue),
        }
    }
}

#[async_trait]
impl WorkerExecutor<SyncTask> for SyncTaskExecutor {
    async fn execute(&self, payload: SyncTask, meta: TaskMetadata) {
        trace!(task_id = meta.id, "Executing sync task");
        match payload {
            SyncTask::GeneratePartitions(stream) => {
                self.enqueuer.generate_partitions(stream.as_ref());
            }
            SyncTask::ReadPartition { id, partition } => {
                self.reader.process_partition(id, partition.as_ref());
            }
        }
    }
}
