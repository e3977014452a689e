//! Slice log messages surfaced through the message repository.

use serde_json::Value;
use tracing::Level;

use crate::protocol::{LogLevel, OutputMessage};

/// Decides whether a discovered partition is announced in the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceLogger {
    always: bool,
}

impl SliceLogger {
    /// Create a slice logger; `always` forces slice messages regardless of
    /// the tracing level.
    #[must_use]
    pub const fn new(always: bool) -> Self {
        Self { always }
    }

    /// Whether slice messages should be emitted: forced, or DEBUG enabled.
    #[must_use]
    pub fn should_log_slice_message(&self) -> bool {
        self.always || tracing::enabled!(Level::DEBUG)
    }

    /// Build the `slice:<json>` log message for a partition's slice.
    #[must_use]
    pub fn create_slice_log_message(slice: Option<&Value>) -> OutputMessage {
        let body = slice.map_or_else(|| "null".to_owned(), Value::to_string);
        OutputMessage::log(LogLevel::Info, format!("slice:{body}"))
    }
}
