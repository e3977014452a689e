//! Builder for [`ConcurrentSource`].

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ConcurrentSourceConfig;
use crate::core::SyncError;
use crate::infra::{InMemoryMessageRepository, MessageRepository};
use crate::source::{ConcurrentSource, Stream};

/// Build a source, validating the configuration and the stream set.
///
/// # Errors
///
/// Returns [`SyncError::InvalidConfig`] when the configuration does not
/// validate or two streams share a name.
pub fn build_source(
    cfg: &ConcurrentSourceConfig,
    streams: Vec<Arc<dyn Stream>>,
    message_repository: Arc<dyn MessageRepository>,
) -> Result<ConcurrentSource, SyncError> {
    cfg.validate()
        .map_err(|e| SyncError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut seen = HashSet::with_capacity(streams.len());
    for stream in &streams {
        if !seen.insert(stream.name()) {
            return Err(SyncError::InvalidConfig(format!(
                "duplicate stream name `{}`",
                stream.name()
            )));
        }
    }

    ConcurrentSource::new(cfg.clone(), streams, message_repository)
}

/// Incremental construction of a [`ConcurrentSource`].
pub struct SourceBuilder {
    config: ConcurrentSourceConfig,
    streams: Vec<Arc<dyn Stream>>,
    message_repository: Option<Arc<dyn MessageRepository>>,
}

impl SourceBuilder {
    /// Start from a configuration.
    #[must_use]
    pub const fn new(config: ConcurrentSourceConfig) -> Self {
        Self {
            config,
            streams: Vec::new(),
            message_repository: None,
        }
    }

    /// Source name from the configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ConcurrentSourceConfig {
        &self.config
    }

    /// Add a stream. Streams are offered to the catalog in insertion order.
    #[must_use]
    pub fn with_stream(mut self, stream: Arc<dyn Stream>) -> Self {
        self.streams.push(stream);
        self
    }

    /// Use a specific side-channel repository instead of a fresh in-memory one.
    #[must_use]
    pub fn with_message_repository(mut self, repository: Arc<dyn MessageRepository>) -> Self {
        self.message_repository = Some(repository);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// See [`build_source`].
    pub fn build(self) -> Result<ConcurrentSource, SyncError> {
        let repository = self
            .message_repository
            .unwrap_or_else(|| Arc::new(InMemoryMessageRepository::new()) as Arc<dyn MessageRepository>);
        build_source(&self.config, self.streams, repository)
    }
}
