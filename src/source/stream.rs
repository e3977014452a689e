//! Stream contract.

use std::sync::Arc;

use crate::core::AppResult;
use crate::source::{Cursor, Partition};

/// Lazy sequence of partitions discovered for one stream.
pub type PartitionIter<'a> = Box<dyn Iterator<Item = AppResult<Arc<dyn Partition>>> + Send + 'a>;

/// Outcome of a stream availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamAvailability {
    available: bool,
    reason: Option<String>,
}

impl StreamAvailability {
    /// The stream can be read.
    #[must_use]
    pub const fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    /// The stream cannot be read, for the given reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }

    /// Whether the stream can be read.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Why the stream is unavailable.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// A named, namespaced source of records.
///
/// Streams are created before a run and outlive it; the driver only keeps a
/// lookup by name for the duration of one sync.
pub trait Stream: Send + Sync {
    /// Stream name, unique within a source.
    fn name(&self) -> &str;

    /// Optional namespace.
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Whether the stream can be read right now. Unavailable streams are
    /// skipped without affecting the rest of the sync.
    fn check_availability(&self) -> StreamAvailability {
        StreamAvailability::available()
    }

    /// Discover the stream's partitions. Runs on a worker thread.
    ///
    /// # Errors
    ///
    /// A discovery failure aborts the whole run.
    fn generate_partitions(&self) -> AppResult<PartitionIter<'_>>;

    /// The stream's progress tracker.
    fn cursor(&self) -> &dyn Cursor;
}
