//! Partition contract.

use std::fmt::Debug;

use serde_json::Value;

use crate::core::AppResult;

/// Lazy sequence of record payloads produced by one partition.
pub type RecordIter<'a> = Box<dyn Iterator<Item = AppResult<Value>> + Send + 'a>;

/// A discovered unit of work belonging to exactly one stream.
///
/// The `Debug` representation is what appears in logs and error messages.
pub trait Partition: Send + Sync + Debug {
    /// Name of the stream owning this partition.
    fn stream_name(&self) -> &str;

    /// Read the partition's records. The sequence must terminate for the run
    /// to finish.
    ///
    /// # Errors
    ///
    /// Failing to start or continue reading aborts the whole run.
    fn read(&self) -> AppResult<RecordIter<'_>>;

    /// Slice descriptor surfaced in slice log messages, if any.
    fn to_slice(&self) -> Option<Value> {
        None
    }
}
