//! Output messages and configured catalog models.

pub mod catalog;
pub mod message;

pub use catalog::{ConfiguredCatalog, ConfiguredStream};
pub use message::{
    LogLevel, LogMessage, OutputMessage, RecordMessage, StreamStatus, StreamStatusMessage,
};
