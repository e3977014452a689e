//! Messages emitted by a sync run.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::clock::now_ms;

/// Lifecycle status of a stream within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// Partition discovery was submitted.
    Started,
    /// The first record was observed.
    Running,
    /// Every partition was read and discovery finished.
    Complete,
    /// The run aborted before the stream finished.
    Incomplete,
}

impl StreamStatus {
    /// Whether no further transition can follow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Incomplete)
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "STARTED",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Incomplete => "INCOMPLETE",
        };
        f.write_str(s)
    }
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

/// A record in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    /// Stream name.
    pub stream: String,
    /// Stream namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Record payload.
    pub data: Value,
    /// Emission time, milliseconds since epoch.
    pub emitted_at: u64,
}

/// A stream status transition in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatusMessage {
    /// Stream name.
    pub stream: String,
    /// Stream namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// New status.
    pub status: StreamStatus,
}

/// A log line interleaved in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Severity.
    pub level: LogLevel,
    /// Text.
    pub message: String,
}

/// One element of a run's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputMessage {
    /// A record.
    Record(RecordMessage),
    /// A stream status transition.
    StreamStatus(StreamStatusMessage),
    /// A log line.
    Log(LogMessage),
}

impl OutputMessage {
    /// Build a record message stamped with the current time.
    pub fn record(stream: &str, namespace: Option<&str>, data: Value) -> Self {
        Self::Record(RecordMessage {
            stream: stream.to_owned(),
            namespace: namespace.map(str::to_owned),
            data,
            emitted_at: u64::try_from(now_ms()).unwrap_or(u64::MAX),
        })
    }

    /// Build a stream status message.
    pub fn stream_status(stream: &str, namespace: Option<&str>, status: StreamStatus) -> Self {
        Self::StreamStatus(StreamStatusMessage {
            stream: stream.to_owned(),
            namespace: namespace.map(str::to_owned),
            status,
        })
    }

    /// Build a log message.
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log(LogMessage {
            level,
            message: message.into(),
        })
    }

    /// The record, if this is one.
    #[must_use]
    pub const fn as_record(&self) -> Option<&RecordMessage> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// The status transition, if this is one.
    #[must_use]
    pub const fn as_stream_status(&self) -> Option<&StreamStatusMessage> {
        match self {
            Self::StreamStatus(s) => Some(s),
            _ => None,
        }
    }
}
