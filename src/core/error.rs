//! Error types for sync runs.

use std::time::Duration;

use thiserror::Error;

use crate::core::worker_pool::PoolError;

/// Errors that end a sync run.
///
/// Task failures never escape a worker: they travel through the coordination
/// queue as [`QueueItem::Error`](crate::core::QueueItem::Error) and are raised
/// by the driver after it has marked unfinished streams INCOMPLETE.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A configured stream is not provided by the source.
    #[error(
        "the stream {0} no longer exists in the configuration. Refresh the schema in \
         replication settings and remove this stream from future sync attempts"
    )]
    StreamNotFound(String),
    /// Partition discovery failed.
    #[error("partition generation failed for stream `{stream}`: {source}")]
    PartitionGeneration {
        /// Stream whose discovery failed.
        stream: String,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },
    /// Reading a partition failed.
    #[error("reading partition {partition} of stream `{stream}` failed: {source}")]
    PartitionRead {
        /// Stream owning the partition.
        stream: String,
        /// Loggable representation of the partition.
        partition: String,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },
    /// Collaborator code panicked inside a task.
    #[error("{task} panicked: {message}")]
    TaskPanicked {
        /// Which task panicked.
        task: String,
        /// Panic payload, when it was a string.
        message: String,
    },
    /// No queue item arrived within the gap timeout.
    #[error("no progress reported for {timeout:?}; the sync is considered stalled")]
    Stalled {
        /// The gap timeout that elapsed.
        timeout: Duration,
    },
    /// Every producer of the coordination queue is gone.
    #[error("coordination queue closed before the sync finished")]
    QueueClosed,
    /// A queue item referenced a stream that is not part of the run.
    #[error("received an item for stream `{0}` which is not part of this sync")]
    UnknownStream(String),
    /// Submitting work to the pool failed.
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for collaborator code (discovery, reading) using anyhow.
pub type AppResult<T> = Result<T, anyhow::Error>;
