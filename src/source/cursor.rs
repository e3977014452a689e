//! Per-stream progress tracking contract.

use crate::core::Record;
use crate::source::Partition;

/// Progress tracker attached to a stream.
///
/// Only the driver calls into a cursor, from a single thread, but the stream
/// owning it is shared with workers, so implementations use interior
/// mutability.
pub trait Cursor: Send + Sync {
    /// Update the progress watermark with an emitted record.
    fn observe(&self, record: &Record);

    /// Finalize bookkeeping for a partition whose records were all emitted.
    fn close_partition(&self, partition: &dyn Partition);
}

/// Cursor for streams that do not track progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCursor;

impl Cursor for NoopCursor {
    fn observe(&self, _record: &Record) {}

    fn close_partition(&self, _partition: &dyn Partition) {}
}
