//! Tests for builder modules

use std::sync::Arc;

use prometheus_concurrent_source::builders::{build_source, SourceBuilder};
use prometheus_concurrent_source::config::ConcurrentSourceConfig;
use prometheus_concurrent_source::core::{AppResult, SyncError};
use prometheus_concurrent_source::infra::{InMemoryMessageRepository, MessageRepository};
use prometheus_concurrent_source::protocol::{ConfiguredCatalog, LogLevel, OutputMessage};
use prometheus_concurrent_source::source::{Cursor, NoopCursor, PartitionIter, Stream};

struct Named(&'static str);

impl Stream for Named {
    fn name(&self) -> &str {
        self.0
    }

    fn generate_partitions(&self) -> AppResult<PartitionIter<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn cursor(&self) -> &dyn Cursor {
        &NoopCursor
    }
}

#[test]
fn test_source_builder_defaults() {
    let builder = SourceBuilder::new(ConcurrentSourceConfig::new().with_name("crm"));
    assert_eq!(builder.name(), "crm");
    assert_eq!(builder.config().max_concurrent_partition_generators, 1);
}

#[test]
fn test_build_source_rejects_duplicate_streams() {
    let result = build_source(
        &ConcurrentSourceConfig::new(),
        vec![Arc::new(Named("users")), Arc::new(Named("users"))],
        Arc::new(InMemoryMessageRepository::new()),
    );
    match result {
        Err(SyncError::InvalidConfig(msg)) => assert!(msg.contains("users")),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("duplicate streams accepted"),
    }
}

#[test]
fn test_build_source_rejects_invalid_config() {
    let result = build_source(
        &ConcurrentSourceConfig::new().with_max_workers(0),
        Vec::new(),
        Arc::new(InMemoryMessageRepository::new()),
    );
    assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
}

#[test]
fn test_builder_wires_message_repository() {
    let repository = Arc::new(InMemoryMessageRepository::new());
    repository.log(LogLevel::Warn, || "left over from setup".to_string());

    let source = SourceBuilder::new(ConcurrentSourceConfig::new().with_max_workers(1))
        .with_stream(Arc::new(Named("users")))
        .with_message_repository(Arc::clone(&repository) as Arc<dyn MessageRepository>)
        .build()
        .unwrap();

    let output: Vec<OutputMessage> = source
        .read(&ConfiguredCatalog::from_names(["users"]))
        .unwrap()
        .map(Result::unwrap)
        .collect();

    // STARTED, the drained log before COMPLETE, then COMPLETE.
    assert_eq!(output.len(), 3);
    assert!(matches!(&output[1], OutputMessage::Log(log) if log.message == "left over from setup"));
    assert!(repository.is_empty());
}
