//! Collaborator contracts and the run entry point.

pub mod concurrent_source;
pub mod cursor;
pub mod partition;
pub mod stream;

pub use concurrent_source::ConcurrentSource;
pub use cursor::{Cursor, NoopCursor};
pub use partition::{Partition, RecordIter};
pub use stream::{PartitionIter, Stream, StreamAvailability};
