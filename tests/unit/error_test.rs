//! Tests for error types

use std::error::Error as _;
use std::time::Duration;

use anyhow::anyhow;
use prometheus_concurrent_source::core::{PoolError, SyncError};

#[test]
fn test_stream_not_found_error() {
    let err = SyncError::StreamNotFound("users".to_string());
    assert!(err.to_string().starts_with("the stream users no longer exists"));
}

#[test]
fn test_partition_read_error_keeps_source() {
    let err = SyncError::PartitionRead {
        stream: "orders".to_string(),
        partition: "page 3".to_string(),
        source: anyhow!("connection reset"),
    };
    assert_eq!(
        err.to_string(),
        "reading partition page 3 of stream `orders` failed: connection reset"
    );
    assert_eq!(err.source().unwrap().to_string(), "connection reset");
}

#[test]
fn test_stalled_error() {
    let err = SyncError::Stalled {
        timeout: Duration::from_secs(2),
    };
    assert_eq!(
        err.to_string(),
        "no progress reported for 2s; the sync is considered stalled"
    );
}

#[test]
fn test_pool_error_converts() {
    let err: SyncError = PoolError::PoolShutdown.into();
    assert!(matches!(err, SyncError::Pool(PoolError::PoolShutdown)));
    assert_eq!(err.to_string(), "worker pool error: pool has been shut down");
}

#[test]
fn test_pool_error_display() {
    assert_eq!(PoolError::QueueFull.to_string(), "task queue is full");
    assert_eq!(PoolError::Timeout.to_string(), "operation timed out");
    assert_eq!(
        PoolError::InvalidConfig("worker_count".to_string()).to_string(),
        "invalid configuration: worker_count"
    );
}
