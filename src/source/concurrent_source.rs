//! Entry point: resolve a configured catalog against the known streams and
//! start a sync run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ConcurrentSourceConfig;
use crate::core::{SyncError, SyncRun};
use crate::infra::MessageRepository;
use crate::protocol::ConfiguredCatalog;
use crate::source::Stream;

/// A set of streams read concurrently through a bounded worker pool.
pub struct ConcurrentSource {
    config: ConcurrentSourceConfig,
    streams: Vec<Arc<dyn Stream>>,
    message_repository: Arc<dyn MessageRepository>,
}

impl ConcurrentSource {
    /// Create a source over `streams`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `config` does not validate.
    pub fn new(
        config: ConcurrentSourceConfig,
        streams: Vec<Arc<dyn Stream>>,
        message_repository: Arc<dyn MessageRepository>,
    ) -> Result<Self, SyncError> {
        config.validate().map_err(SyncError::InvalidConfig)?;
        Ok(Self {
            config,
            streams,
            message_repository,
        })
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &ConcurrentSourceConfig {
        &self.config
    }

    /// The side channel drained into every run's output.
    #[must_use]
    pub fn message_repository(&self) -> Arc<dyn MessageRepository> {
        Arc::clone(&self.message_repository)
    }

    /// Start syncing the streams named in `catalog`, in catalog order.
    ///
    /// Unavailable streams are skipped with a warning and produce no output.
    /// A configured stream this source does not know is an error when
    /// `raise_on_missing_stream` is set, and skipped otherwise.
    ///
    /// # Errors
    ///
    /// [`SyncError::StreamNotFound`] for a missing stream, or
    /// [`SyncError::Pool`] if the worker pool cannot start.
    pub fn read(&self, catalog: &ConfiguredCatalog) -> Result<SyncRun, SyncError> {
        let by_name: HashMap<&str, &Arc<dyn Stream>> = self
            .streams
            .iter()
            .map(|stream| (stream.name(), stream))
            .collect();

        let mut selected = Vec::with_capacity(catalog.streams.len());
        let mut seen = HashSet::with_capacity(catalog.streams.len());
        for configured in &catalog.streams {
            if !seen.insert(configured.name.as_str()) {
                warn!(stream = %configured.name, "Stream configured twice, syncing it once");
                continue;
            }
            let Some(stream) = by_name.get(configured.name.as_str()) else {
                if self.config.raise_on_missing_stream {
                    return Err(SyncError::StreamNotFound(configured.name.clone()));
                }
                warn!(
                    stream = %configured.name,
                    "Stream {} is not in the source's stream list, skipping",
                    configured.name
                );
                continue;
            };

            let availability = stream.check_availability();
            if !availability.is_available() {
                warn!(
                    stream = %configured.name,
                    reason = availability.reason().unwrap_or_default(),
                    "Skipped syncing stream {} because it is unavailable",
                    configured.name
                );
                continue;
            }
            debug!(stream = %configured.name, "Stream selected for sync");
            selected.push(Arc::clone(*stream));
        }

        SyncRun::start(&self.config, selected, self.message_repository())
    }
}
