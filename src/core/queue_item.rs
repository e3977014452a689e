//! Items flowing through the coordination queue.
//!
//! Many tasks push, one driver pops. Items pushed by the same task keep their
//! order; there is no order between items of different tasks.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use serde_json::Value;

use crate::core::SyncError;
use crate::source::Partition;

/// Driver-assigned identity of a partition within one run.
///
/// Partitions are registered in an arena when the driver first sees them; the
/// index is what reading tasks report back, so identity never depends on
/// pointers crossing threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub usize);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition#{}", self.0)
    }
}

/// One payload item read from a partition.
#[derive(Debug, Clone)]
pub struct Record {
    /// Partition the record was read from.
    pub partition: PartitionId,
    /// Name of the owning stream.
    pub stream_name: Arc<str>,
    /// Opaque payload.
    pub data: Value,
}

impl Record {
    /// Create a record.
    pub fn new(partition: PartitionId, stream_name: impl Into<Arc<str>>, data: Value) -> Self {
        Self {
            partition,
            stream_name: stream_name.into(),
            data,
        }
    }

    /// Name of the owning stream.
    #[must_use]
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

// Structural: same partition and same data.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.partition == other.partition && self.data == other.data
    }
}

/// Sentinel: a partition produced all of its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionCompleted {
    /// The finished partition.
    pub partition: PartitionId,
}

/// Sentinel: a stream finished discovering partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationCompleted {
    /// The stream whose generator is exhausted.
    pub stream: String,
}

/// Everything a task can report to the driver.
#[derive(Debug)]
pub enum QueueItem {
    /// A record read from a partition.
    Record(Record),
    /// A newly discovered partition.
    Partition(Arc<dyn Partition>),
    /// A partition has no more records.
    PartitionCompleted(PartitionCompleted),
    /// A stream has no more partitions.
    GenerationCompleted(GenerationCompleted),
    /// A task failed; the run must abort.
    Error(SyncError),
}

impl QueueItem {
    /// Short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Record(_) => "record",
            Self::Partition(_) => "partition",
            Self::PartitionCompleted(_) => "partition_completed",
            Self::GenerationCompleted(_) => "generation_completed",
            Self::Error(_) => "error",
        }
    }
}

/// Create the coordination queue; `None` capacity means unbounded.
#[must_use]
pub fn channel(capacity: Option<usize>) -> (Sender<QueueItem>, Receiver<QueueItem>) {
    capacity.map_or_else(unbounded, bounded)
}
