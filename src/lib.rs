//! # Prometheus Concurrent Source
//!
//! A concurrent multi-stream sync scheduler.
//!
//! Given a set of independent streams, the scheduler discovers each stream's
//! partitions, reads every partition through a bounded worker pool and
//! produces one ordered sequence of stream status transitions and records.
//! Discovery and reading are bounded separately, per-stream completion is
//! tracked by a single driver, and any task failure aborts the whole run
//! cleanly.
//!
//! ## Key Features
//!
//! - **Worker Pool**: dedicated OS threads, each with its own single-threaded
//!   tokio runtime, so blocking reads never stall the caller
//! - **Discovery Cap**: at most `max_concurrent_partition_generators` streams
//!   discover partitions at once, while reading stays parallel
//! - **Stream Lifecycle**: every stream goes `STARTED`, `RUNNING` on its first
//!   record, then exactly one of `COMPLETE` or `INCOMPLETE`
//! - **Abort Semantics**: the first error cancels pending work, marks unfinished
//!   streams `INCOMPLETE` and is surfaced to the caller
//! - **Side Channel**: slice logs and diagnostics from a
//!   [`MessageRepository`](infra::MessageRepository) are interleaved with records
//!
//! ## Reading a source
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use prometheus_concurrent_source::builders::SourceBuilder;
//! use prometheus_concurrent_source::config::ConcurrentSourceConfig;
//! use prometheus_concurrent_source::protocol::ConfiguredCatalog;
//!
//! let source = SourceBuilder::new(ConcurrentSourceConfig::new().with_max_workers(4))
//!     .with_stream(Arc::new(users_stream))
//!     .with_stream(Arc::new(orders_stream))
//!     .build()?;
//!
//! for message in source.read(&ConfiguredCatalog::from_names(["users", "orders"]))? {
//!     println!("{}", serde_json::to_string(&message?)?);
//! }
//! ```
//!
//! For complete examples, see:
//! - `tests/sync_scenarios_test.rs` - end-to-end runs
//! - `tests/worker_pool_test.rs` - the pool on its own

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct a source from configuration.
pub mod builders;
/// Configuration models for runs and the worker pool.
pub mod config;
/// Scheduling: queue items, worker pool, tasks and the sync driver.
pub mod core;
/// Infrastructure adapters for side-channel messages.
pub mod infra;
/// Output messages and configured catalogs.
pub mod protocol;
/// Collaborator contracts and the run entry point.
pub mod source;
/// Shared utilities.
pub mod util;
