//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use prometheus_concurrent_source::config::{ConcurrentSourceConfig, WorkerPoolConfig};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_source_config_defaults() {
    let cfg = ConcurrentSourceConfig::default();
    assert_eq!(cfg.name, "concurrent_source");
    assert_eq!(cfg.max_concurrent_partition_generators, 1);
    assert_eq!(cfg.timeout(), Duration::from_secs(900));
    assert!(cfg.raise_on_missing_stream);
    assert!(cfg.queue_capacity.is_none());
    assert!(!cfg.log_slices);
    assert!(cfg.max_workers >= 1);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_source_config_invalid_values() {
    assert!(ConcurrentSourceConfig::new().with_max_workers(0).validate().is_err());
    assert!(ConcurrentSourceConfig::new()
        .with_max_concurrent_partition_generators(0)
        .validate()
        .is_err());
    assert!(ConcurrentSourceConfig::new()
        .with_timeout(Duration::ZERO)
        .validate()
        .is_err());
    assert!(ConcurrentSourceConfig::new().with_queue_capacity(0).validate().is_err());
    assert!(ConcurrentSourceConfig::new().with_name("  ").validate().is_err());
}

#[test]
fn test_source_config_from_json_fills_defaults() {
    let cfg = ConcurrentSourceConfig::from_json_str(
        r#"{"name": "crm", "max_workers": 3, "queue_capacity": 64}"#,
    )
    .unwrap();
    assert_eq!(cfg.name, "crm");
    assert_eq!(cfg.max_workers, 3);
    assert_eq!(cfg.queue_capacity, Some(64));
    assert_eq!(cfg.timeout(), Duration::from_secs(900));
    assert_eq!(cfg.max_concurrent_partition_generators, 1);
}

#[test]
fn test_timeout_round_trips_through_setter_and_json() {
    let cfg = ConcurrentSourceConfig::new().with_timeout(Duration::from_millis(1500));
    assert_eq!(cfg.timeout(), Duration::from_millis(1500));
    assert!(cfg.validate().is_ok());

    let short = ConcurrentSourceConfig::new().with_timeout(Duration::from_millis(10));
    assert_eq!(short.timeout(), Duration::from_millis(10));
    assert!(short.validate().is_ok());

    let json = serde_json::to_string(&cfg).unwrap();
    let parsed = ConcurrentSourceConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed.timeout(), Duration::from_millis(1500));
    assert_eq!(parsed, cfg);
}

#[test]
fn test_source_config_from_json_rejects_invalid() {
    assert!(ConcurrentSourceConfig::from_json_str(r#"{"max_workers": 0}"#).is_err());
    assert!(ConcurrentSourceConfig::from_json_str("not json").is_err());
}

#[test]
fn test_source_config_from_lookup() {
    let cfg = ConcurrentSourceConfig::from_lookup(lookup(&[
        ("CONCURRENT_SOURCE_NAME", "erp"),
        ("CONCURRENT_SOURCE_MAX_WORKERS", "6"),
        ("CONCURRENT_SOURCE_TIMEOUT_SECS", "30"),
        ("CONCURRENT_SOURCE_MAX_CONCURRENT_PARTITION_GENERATORS", "2"),
        ("CONCURRENT_SOURCE_RAISE_ON_MISSING_STREAM", "false"),
    ]))
    .unwrap();
    assert_eq!(cfg.name, "erp");
    assert_eq!(cfg.max_workers, 6);
    assert_eq!(cfg.timeout(), Duration::from_secs(30));
    assert_eq!(cfg.max_concurrent_partition_generators, 2);
    assert!(!cfg.raise_on_missing_stream);
}

#[test]
fn test_source_config_from_lookup_rejects_garbage() {
    let err = ConcurrentSourceConfig::from_lookup(lookup(&[(
        "CONCURRENT_SOURCE_MAX_WORKERS",
        "many",
    )]))
    .unwrap_err();
    assert!(err.contains("MAX_WORKERS"), "{err}");
}

#[test]
fn test_worker_pool_config_follows_source() {
    let pool = ConcurrentSourceConfig::new().with_max_workers(5).worker_pool_config();
    assert_eq!(pool.worker_count, 5);
    assert!(pool.max_queue_depth.is_none());
    assert!(pool.validate().is_ok());
}

#[test]
fn test_worker_pool_config_invalid_values() {
    assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_max_queue_depth(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_thread_stack_size(1024).validate().is_err());
}
