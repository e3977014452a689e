//! Fake streams, partitions and cursors shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use prometheus_concurrent_source::config::ConcurrentSourceConfig;
use prometheus_concurrent_source::core::{AppResult, Record, SyncError, SyncRun};
use prometheus_concurrent_source::infra::InMemoryMessageRepository;
use prometheus_concurrent_source::protocol::{ConfiguredCatalog, OutputMessage, StreamStatus};
use prometheus_concurrent_source::source::{
    ConcurrentSource, Cursor, Partition, PartitionIter, RecordIter, Stream, StreamAvailability,
};
use serde_json::{json, Value};

// ============================================================================
// CONCURRENCY TRACKING
// ============================================================================

/// Counts how many guarded sections are running and the peak reached.
#[derive(Debug, Default)]
pub struct ConcurrencyTracker {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn enter(self: &Arc<Self>) -> TrackerGuard {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        TrackerGuard(Arc::clone(self))
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct TrackerGuard(Arc<ConcurrencyTracker>);

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// FAKE PARTITION
// ============================================================================

#[derive(Debug)]
pub struct FakePartition {
    pub stream: String,
    pub label: String,
    pub rows: usize,
    pub fail_after: Option<usize>,
    pub initial_delay: Duration,
    pub row_delay: Duration,
    pub slice: Option<Value>,
    pub tracker: Option<Arc<ConcurrencyTracker>>,
}

impl FakePartition {
    pub fn new(stream: &str, label: &str, rows: usize) -> Self {
        Self {
            stream: stream.to_owned(),
            label: label.to_owned(),
            rows,
            fail_after: None,
            initial_delay: Duration::ZERO,
            row_delay: Duration::ZERO,
            slice: None,
            tracker: None,
        }
    }

    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_row_delay(mut self, delay: Duration) -> Self {
        self.row_delay = delay;
        self
    }

    pub fn with_slice(mut self, slice: Value) -> Self {
        self.slice = Some(slice);
        self
    }

    pub fn tracked_by(mut self, tracker: &Arc<ConcurrencyTracker>) -> Self {
        self.tracker = Some(Arc::clone(tracker));
        self
    }
}

struct Rows {
    _guard: Option<TrackerGuard>,
    label: String,
    next: usize,
    rows: usize,
    fail_after: Option<usize>,
    row_delay: Duration,
}

impl Iterator for Rows {
    type Item = AppResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fail_after == Some(self.next) {
            self.fail_after = None;
            self.rows = 0;
            return Some(Err(anyhow!("{} lost its connection", self.label)));
        }
        if self.next >= self.rows {
            return None;
        }
        if !self.row_delay.is_zero() {
            thread::sleep(self.row_delay);
        }
        let row = json!({"partition": self.label, "i": self.next});
        self.next += 1;
        Some(Ok(row))
    }
}

impl Partition for FakePartition {
    fn stream_name(&self) -> &str {
        &self.stream
    }

    fn read(&self) -> AppResult<RecordIter<'_>> {
        let guard = self.tracker.as_ref().map(ConcurrencyTracker::enter);
        if !self.initial_delay.is_zero() {
            thread::sleep(self.initial_delay);
        }
        Ok(Box::new(Rows {
            _guard: guard,
            label: self.label.clone(),
            next: 0,
            rows: self.rows,
            fail_after: self.fail_after,
            row_delay: self.row_delay,
        }))
    }

    fn to_slice(&self) -> Option<Value> {
        self.slice.clone()
    }
}

// ============================================================================
// RECORDING CURSOR
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingCursor {
    observed: Mutex<Vec<Value>>,
    closed: Mutex<Vec<String>>,
}

impl RecordingCursor {
    pub fn observed(&self) -> usize {
        self.observed.lock().len()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().clone()
    }
}

impl Cursor for RecordingCursor {
    fn observe(&self, record: &Record) {
        self.observed.lock().push(record.data.clone());
    }

    fn close_partition(&self, partition: &dyn Partition) {
        self.closed.lock().push(format!("{partition:?}"));
    }
}

// ============================================================================
// FAKE STREAM
// ============================================================================

pub struct FakeStream {
    pub name: String,
    pub partitions: Vec<Arc<FakePartition>>,
    pub unavailable: Option<String>,
    pub discovery_error: Option<String>,
    pub discovery_delay: Duration,
    pub discovery_tracker: Option<Arc<ConcurrencyTracker>>,
    pub cursor: RecordingCursor,
}

impl FakeStream {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            partitions: Vec::new(),
            unavailable: None,
            discovery_error: None,
            discovery_delay: Duration::ZERO,
            discovery_tracker: None,
            cursor: RecordingCursor::default(),
        }
    }

    /// A stream with `partitions` partitions of `rows` rows each, labelled
    /// `<name>-<index>`.
    pub fn uniform(name: &str, partitions: usize, rows: usize) -> Self {
        let mut stream = Self::new(name);
        for idx in 0..partitions {
            stream = stream.with_partition(FakePartition::new(name, &format!("{name}-{idx}"), rows));
        }
        stream
    }

    pub fn with_partition(mut self, partition: FakePartition) -> Self {
        self.partitions.push(Arc::new(partition));
        self
    }

    pub fn unavailable(mut self, reason: &str) -> Self {
        self.unavailable = Some(reason.to_owned());
        self
    }

    pub fn failing_discovery(mut self, reason: &str) -> Self {
        self.discovery_error = Some(reason.to_owned());
        self
    }

    pub fn with_discovery_delay(mut self, delay: Duration) -> Self {
        self.discovery_delay = delay;
        self
    }

    pub fn discovery_tracked_by(mut self, tracker: &Arc<ConcurrencyTracker>) -> Self {
        self.discovery_tracker = Some(Arc::clone(tracker));
        self
    }
}

impl Stream for FakeStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_availability(&self) -> StreamAvailability {
        match &self.unavailable {
            Some(reason) => StreamAvailability::unavailable(reason.clone()),
            None => StreamAvailability::available(),
        }
    }

    fn generate_partitions(&self) -> AppResult<PartitionIter<'_>> {
        let _guard = self.discovery_tracker.as_ref().map(ConcurrencyTracker::enter);
        if !self.discovery_delay.is_zero() {
            thread::sleep(self.discovery_delay);
        }
        if let Some(reason) = &self.discovery_error {
            return Err(anyhow!("{reason}"));
        }
        let partitions: Vec<AppResult<Arc<dyn Partition>>> = self
            .partitions
            .iter()
            .map(|p| Ok(Arc::clone(p) as Arc<dyn Partition>))
            .collect();
        Ok(Box::new(partitions.into_iter()))
    }

    fn cursor(&self) -> &dyn Cursor {
        &self.cursor
    }
}

// ============================================================================
// RUN HELPERS
// ============================================================================

pub fn config(max_workers: usize) -> ConcurrentSourceConfig {
    ConcurrentSourceConfig::new()
        .with_name("test_source")
        .with_max_workers(max_workers)
        .with_timeout(Duration::from_secs(10))
}

pub fn start(
    cfg: ConcurrentSourceConfig,
    streams: &[Arc<FakeStream>],
    catalog: &[&str],
) -> SyncRun {
    let streams: Vec<Arc<dyn Stream>> = streams
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn Stream>)
        .collect();
    ConcurrentSource::new(cfg, streams, Arc::new(InMemoryMessageRepository::new()))
        .unwrap()
        .read(&ConfiguredCatalog::from_names(catalog.iter().copied()))
        .unwrap()
}

/// Everything a run yielded before it ended, plus the error it raised.
pub struct RunOutput {
    pub messages: Vec<OutputMessage>,
    pub error: Option<SyncError>,
}

pub fn drain(run: &mut SyncRun) -> RunOutput {
    let mut messages = Vec::new();
    let mut error = None;
    for item in run.by_ref() {
        match item {
            Ok(message) => messages.push(message),
            Err(e) => {
                assert!(error.is_none(), "run raised twice");
                error = Some(e);
            }
        }
    }
    RunOutput { messages, error }
}

impl RunOutput {
    pub fn statuses(&self, stream: &str) -> Vec<StreamStatus> {
        self.messages
            .iter()
            .filter_map(OutputMessage::as_stream_status)
            .filter(|s| s.stream == stream)
            .map(|s| s.status)
            .collect()
    }

    pub fn records(&self, stream: &str) -> Vec<Value> {
        self.messages
            .iter()
            .filter_map(OutputMessage::as_record)
            .filter(|r| r.stream == stream)
            .map(|r| r.data.clone())
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.messages.iter().filter(|m| m.as_record().is_some()).count()
    }

    /// Per-stream timeline: statuses by name, records as "record".
    pub fn timeline(&self, stream: &str) -> Vec<String> {
        self.messages
            .iter()
            .filter_map(|m| {
                if let Some(s) = m.as_stream_status() {
                    (s.stream == stream).then(|| s.status.to_string())
                } else {
                    m.as_record()
                        .filter(|r| r.stream == stream)
                        .map(|_| "record".to_owned())
                }
            })
            .collect()
    }

    pub fn mentions(&self, stream: &str) -> bool {
        !self.timeline(stream).is_empty()
    }
}

/// Partition labels in record order, for checking interleaving.
pub fn partition_labels(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r["partition"].as_str().map(str::to_owned))
        .collect()
}

/// Whether every label appears in one contiguous block.
pub fn contiguous(labels: &[String]) -> bool {
    let mut finished: Vec<&str> = Vec::new();
    let mut current: Option<&str> = None;
    for label in labels {
        if current == Some(label.as_str()) {
            continue;
        }
        if finished.contains(&label.as_str()) {
            return false;
        }
        if let Some(prev) = current {
            finished.push(prev);
        }
        current = Some(label.as_str());
    }
    true
}
