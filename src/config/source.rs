//! Run-level configuration for [`ConcurrentSource`](crate::source::ConcurrentSource).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::WorkerPoolConfig;

/// Default gap timeout between two queue items, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 900_000;

/// Default number of streams allowed to discover partitions at the same time.
pub const DEFAULT_MAX_CONCURRENT_PARTITION_GENERATORS: usize = 1;

/// Prefix of the environment variables read by [`ConcurrentSourceConfig::from_env`].
pub const ENV_PREFIX: &str = "CONCURRENT_SOURCE_";

/// Knobs bounding how much discovery and reading a sync performs in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrentSourceConfig {
    /// Source name used in logs and the timing report.
    pub name: String,
    /// Worker pool size: the maximum number of generation and reading tasks
    /// executing at any instant.
    pub max_workers: usize,
    /// Maximum gap, in milliseconds, between two successive queue items
    /// before the run is considered stalled. This is not a deadline for the
    /// whole run.
    pub timeout_ms: u64,
    /// Maximum number of streams discovering partitions simultaneously.
    /// Defaults to 1: discovery is serialized while reading is parallel.
    pub max_concurrent_partition_generators: usize,
    /// Fail the run when a configured stream is unknown to the source.
    /// When `false` the stream is skipped with a warning.
    pub raise_on_missing_stream: bool,
    /// Capacity of the coordination queue. `None` means unbounded.
    pub queue_capacity: Option<usize>,
    /// Always surface a slice log message per partition. Slice messages are
    /// also surfaced whenever DEBUG logging is enabled.
    pub log_slices: bool,
}

impl Default for ConcurrentSourceConfig {
    fn default() -> Self {
        Self {
            name: "concurrent_source".into(),
            max_workers: num_cpus::get(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrent_partition_generators: DEFAULT_MAX_CONCURRENT_PARTITION_GENERATORS,
            raise_on_missing_stream: true,
            queue_capacity: None,
            log_slices: false,
        }
    }
}

impl ConcurrentSourceConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the worker pool size.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the gap timeout. Sub-millisecond remainders round up, so a
    /// non-zero duration never becomes zero.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = timeout.as_millis();
        if timeout > Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX)) {
            millis += 1;
        }
        self.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// Set the discovery-concurrency cap.
    #[must_use]
    pub const fn with_max_concurrent_partition_generators(mut self, cap: usize) -> Self {
        self.max_concurrent_partition_generators = cap;
        self
    }

    /// Choose between failing and skipping on unknown configured streams.
    #[must_use]
    pub const fn with_raise_on_missing_stream(mut self, raise: bool) -> Self {
        self.raise_on_missing_stream = raise;
        self
    }

    /// Bound the coordination queue.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Force slice log messages on or off.
    #[must_use]
    pub const fn with_log_slices(mut self, log_slices: bool) -> Self {
        self.log_slices = log_slices;
        self
    }

    /// The gap timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Worker pool configuration derived from this run configuration.
    #[must_use]
    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::new().with_worker_count(self.max_workers)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be greater than 0".into());
        }
        if self.max_concurrent_partition_generators == 0 {
            return Err("max_concurrent_partition_generators must be greater than 0".into());
        }
        if self.queue_capacity == Some(0) {
            return Err("queue_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `CONCURRENT_SOURCE_*` environment variables,
    /// loading a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed variable or validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, using the same keys as
    /// [`from_env`](Self::from_env). Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed value or validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: &str| lookup(&format!("{ENV_PREFIX}{field}"));
        let mut cfg = Self::default();

        if let Some(name) = get("NAME") {
            cfg.name = name;
        }
        if let Some(v) = get("MAX_WORKERS") {
            cfg.max_workers = parse_field("MAX_WORKERS", &v)?;
        }
        if let Some(v) = get("TIMEOUT_SECS") {
            let secs: u64 = parse_field("TIMEOUT_SECS", &v)?;
            cfg.timeout_ms = secs.saturating_mul(1000);
        }
        if let Some(v) = get("TIMEOUT_MS") {
            cfg.timeout_ms = parse_field("TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("MAX_CONCURRENT_PARTITION_GENERATORS") {
            cfg.max_concurrent_partition_generators =
                parse_field("MAX_CONCURRENT_PARTITION_GENERATORS", &v)?;
        }
        if let Some(v) = get("RAISE_ON_MISSING_STREAM") {
            cfg.raise_on_missing_stream = parse_field("RAISE_ON_MISSING_STREAM", &v)?;
        }
        if let Some(v) = get("QUEUE_CAPACITY") {
            cfg.queue_capacity = Some(parse_field("QUEUE_CAPACITY", &v)?);
        }
        if let Some(v) = get("LOG_SLICES") {
            cfg.log_slices = parse_field("LOG_SLICES", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_field<T>(field: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{field}: {e}"))
}
