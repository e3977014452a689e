//! Tests for the tracing setup helper

use prometheus_concurrent_source::util::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    println!("\n=== test_init_tracing_is_idempotent ===");

    init_tracing();
    assert!(tracing::dispatcher::has_been_set());

    // A second call finds the subscriber and leaves it in place.
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());
    tracing::info!(target: "telemetry_test", "subscriber installed");

    println!("=== test_init_tracing_is_idempotent PASSED ===\n");
}
