//! Side-channel message repositories.

pub mod memory;

pub use memory::InMemoryMessageRepository;

use crate::protocol::OutputMessage;

/// FIFO buffer for ancillary messages (slice logs, diagnostics) that must be
/// interleaved with a run's main output.
///
/// Anything may emit; the driver drains after every record, at every stream
/// finalization and at the end of a run.
pub trait MessageRepository: Send + Sync {
    /// Buffer a message.
    fn emit(&self, message: OutputMessage);

    /// Take every buffered message, oldest first.
    fn drain(&self) -> Vec<OutputMessage>;
}
