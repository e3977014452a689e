//! In-memory message repository.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::infra::repository::MessageRepository;
use crate::protocol::{LogLevel, OutputMessage};

/// Message repository backed by a mutex-protected deque.
#[derive(Debug)]
pub struct InMemoryMessageRepository {
    messages: Mutex<VecDeque<OutputMessage>>,
    log_level: LogLevel,
}

impl InMemoryMessageRepository {
    /// Create an empty repository keeping log messages at INFO and above.
    #[must_use]
    pub fn new() -> Self {
        Self::with_log_level(LogLevel::Info)
    }

    /// Create an empty repository keeping log messages at `log_level` and above.
    #[must_use]
    pub fn with_log_level(log_level: LogLevel) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            log_level,
        }
    }

    /// Emit a log message if `level` passes the threshold. The message is only
    /// built when it will be kept.
    pub fn log<F>(&self, level: LogLevel, message: F)
    where
        F: FnOnce() -> String,
    {
        if level >= self.log_level {
            self.emit(OutputMessage::log(level, message()));
        }
    }

    /// Number of buffered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRepository for InMemoryMessageRepository {
    fn emit(&self, message: OutputMessage) {
        self.messages.lock().push_back(message);
    }

    fn drain(&self) -> Vec<OutputMessage> {
        self.messages.lock().drain(..).collect()
    }
}
