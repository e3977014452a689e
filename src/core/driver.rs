//! The sync driver: a single-threaded coordinator over the worker pool.
//!
//! [`SyncRun`] owns every piece of per-run scheduling state. Workers never
//! touch it; they only push [`QueueItem`]s, and the driver consumes them one at
//! a time from its own thread, so no locking is involved.
//!
//! Per stream the emitted statuses are strictly `STARTED`, then `RUNNING` on
//! the first record, then exactly one of `COMPLETE` or `INCOMPLETE`.
//!
//! The queue pop timeout bounds the gap between two items, not the whole run:
//! a slow-but-alive sync that keeps producing items never times out, while a
//! sync where every producer went silent fails with [`SyncError::Stalled`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info, info_span, trace, warn, Span};
use uuid::Uuid;

use crate::config::ConcurrentSourceConfig;
use crate::core::queue_item::{channel, PartitionId, QueueItem, Record};
use crate::core::slice_logger::SliceLogger;
use crate::core::tasks::{SyncTask, SyncTaskExecutor};
use crate::core::timing::MultiEventTimer;
use crate::core::worker_pool::{PoolStats, TaskHandle, WorkerPool};
use crate::core::SyncError;
use crate::infra::MessageRepository;
use crate::protocol::{OutputMessage, StreamStatus};
use crate::source::{Partition, Stream};

/// What a finished (or aborted) run observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records emitted per stream.
    pub record_counts: BTreeMap<String, u64>,
    /// Records emitted in total.
    pub total_records: u64,
    /// Time from STARTED to finalization per stream, sorted by stream name.
    pub durations: Vec<(String, Duration)>,
}

enum Phase {
    Running,
    Raising(SyncError),
    Finished,
}

/// One sync run: a lazy, finite sequence of output messages.
///
/// Yields status transitions interleaved with records and side-channel
/// messages. Ends with `None` on success; on failure yields `INCOMPLETE` for
/// every unfinished stream, then the error, then `None`. Output already
/// yielded stays valid either way.
///
/// Dropping a run early cancels every task that has not started.
pub struct SyncRun {
    source_name: String,
    span: Span,
    /// Dropped on abort so detached tasks see a closed queue.
    queue: Option<Receiver<QueueItem>>,
    pool: WorkerPool<SyncTask, SyncTaskExecutor>,
    timeout: Duration,
    message_repository: Arc<dyn MessageRepository>,
    slice_logger: SliceLogger,
    streams: HashMap<String, Arc<dyn Stream>>,
    max_concurrent_generators: usize,
    pending_generators: VecDeque<Arc<dyn Stream>>,
    running_generators: HashSet<String>,
    streams_in_progress: BTreeSet<String>,
    partitions: Vec<Option<Arc<dyn Partition>>>,
    partitions_done_by_stream: HashMap<String, HashMap<PartitionId, bool>>,
    open_partitions: usize,
    record_counts: BTreeMap<String, u64>,
    total_records: u64,
    outstanding: Vec<TaskHandle>,
    timer: MultiEventTimer,
    output: VecDeque<OutputMessage>,
    phase: Phase,
}

impl SyncRun {
    /// Start a run over `streams` (already resolved and available), submitting
    /// the first generation tasks up to the discovery-concurrency cap.
    pub(crate) fn start(
        config: &ConcurrentSourceConfig,
        streams: Vec<Arc<dyn Stream>>,
        message_repository: Arc<dyn MessageRepository>,
    ) -> Result<Self, SyncError> {
        let span = info_span!("sync", source = %config.name, run_id = %Uuid::new_v4());
        let (queue_tx, queue) = channel(config.queue_capacity);
        let pool = span.in_scope(|| {
            WorkerPool::new(config.worker_pool_config(), SyncTaskExecutor::new(queue_tx))
        })?;

        let mut run = Self {
            source_name: config.name.clone(),
            span,
            queue: Some(queue),
            pool,
            timeout: config.timeout(),
            message_repository,
            slice_logger: SliceLogger::new(config.log_slices),
            streams: HashMap::with_capacity(streams.len()),
            max_concurrent_generators: config.max_concurrent_partition_generators,
            pending_generators: VecDeque::with_capacity(streams.len()),
            running_generators: HashSet::new(),
            streams_in_progress: BTreeSet::new(),
            partitions: Vec::new(),
            partitions_done_by_stream: HashMap::with_capacity(streams.len()),
            open_partitions: 0,
            record_counts: BTreeMap::new(),
            total_records: 0,
            outstanding: Vec::new(),
            timer: MultiEventTimer::new(config.name.clone()),
            output: VecDeque::new(),
            phase: Phase::Running,
        };

        for stream in streams {
            let name = stream.name().to_owned();
            run.partitions_done_by_stream.insert(name.clone(), HashMap::new());
            run.record_counts.insert(name.clone(), 0);
            run.streams.insert(name, Arc::clone(&stream));
            run.pending_generators.push_back(stream);
        }

        let span = run.span.clone();
        let _entered = span.enter();
        info!(streams = run.streams.len(), "Starting syncing {}", run.source_name);
        run.start_generators()?;
        Ok(run)
    }

    /// Records and durations observed so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            record_counts: self.record_counts.clone(),
            total_records: self.total_records,
            durations: self.timer.durations(),
        }
    }

    /// Worker pool statistics.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Streams started but not yet finalized, sorted by name.
    pub fn streams_in_progress(&self) -> impl Iterator<Item = &str> {
        self.streams_in_progress.iter().map(String::as_str)
    }

    /// Submit generation tasks until the cap is reached or nothing waits.
    fn start_generators(&mut self) -> Result<(), SyncError> {
        while self.running_generators.len() < self.max_concurrent_generators {
            let Some(stream) = self.pending_generators.pop_front() else {
                break;
            };
            let name = stream.name().to_owned();
            let handle = self
                .pool
                .submit(SyncTask::GeneratePartitions(Arc::clone(&stream)))?;
            self.outstanding.push(handle);
            self.running_generators.insert(name.clone());
            self.streams_in_progress.insert(name.clone());
            self.timer
                .start_event(&name, format!("Syncing stream {name}"));

            info!(stream = %name, "Marking stream as STARTED");
            self.output.push_back(OutputMessage::stream_status(
                &name,
                stream.namespace(),
                StreamStatus::Started,
            ));
        }
        Ok(())
    }

    fn handle_item(&mut self, item: QueueItem) -> Result<(), SyncError> {
        match item {
            QueueItem::Error(error) => Err(error),
            QueueItem::GenerationCompleted(sentinel) => {
                self.on_generation_completed(&sentinel.stream)
            }
            QueueItem::Partition(partition) => self.on_partition(partition),
            QueueItem::PartitionCompleted(sentinel) => {
                self.on_partition_completed(sentinel.partition);
                Ok(())
            }
            QueueItem::Record(record) => self.on_record(record),
        }
    }

    fn on_generation_completed(&mut self, stream: &str) -> Result<(), SyncError> {
        if !self.running_generators.remove(stream) {
            warn!(stream = %stream, "Ignoring duplicate generation sentinel");
            return Ok(());
        }
        debug!(stream = %stream, "Partition generation completed");

        // A stream with no partitions left in flight is done right here.
        self.finalize_if_done(stream);
        self.start_generators()
    }

    fn on_partition(&mut self, partition: Arc<dyn Partition>) -> Result<(), SyncError> {
        let stream = partition.stream_name();
        let Some(done) = self.partitions_done_by_stream.get_mut(stream) else {
            return Err(SyncError::UnknownStream(stream.to_owned()));
        };

        let id = PartitionId(self.partitions.len());
        done.insert(id, false);
        self.open_partitions += 1;
        self.partitions.push(Some(Arc::clone(&partition)));
        trace!(stream = %stream, partition = %id, "Registered partition {partition:?}");

        if self.slice_logger.should_log_slice_message() {
            self.message_repository
                .emit(SliceLogger::create_slice_log_message(partition.to_slice().as_ref()));
        }

        let handle = self.pool.submit(SyncTask::ReadPartition { id, partition })?;
        self.outstanding.push(handle);
        Ok(())
    }

    fn on_partition_completed(&mut self, id: PartitionId) {
        // Taking the arena slot retires the partition; a second sentinel finds
        // it empty.
        let Some(partition) = self.partitions.get_mut(id.0).and_then(|slot| slot.take()) else {
            warn!(partition = %id, "Ignoring completion for an unknown or already completed partition");
            return;
        };
        let stream = partition.stream_name().to_owned();

        if let Some(done) = self
            .partitions_done_by_stream
            .get_mut(&stream)
            .and_then(|partitions| partitions.get_mut(&id))
        {
            *done = true;
        }
        self.open_partitions -= 1;

        if let Some(owner) = self.streams.get(&stream) {
            owner.cursor().close_partition(partition.as_ref());
        }

        self.finalize_if_done(&stream);
        self.outstanding.retain(|handle| !handle.is_done());
    }

    fn on_record(&mut self, record: Record) -> Result<(), SyncError> {
        let Some(stream) = self.streams.get(record.stream_name()).cloned() else {
            return Err(SyncError::UnknownStream(record.stream_name().to_owned()));
        };
        let name = stream.name();

        let count = self.record_counts.entry(name.to_owned()).or_insert(0);
        *count += 1;
        if *count == 1 {
            info!(stream = %name, "Marking stream as RUNNING");
            self.output.push_back(OutputMessage::stream_status(
                name,
                stream.namespace(),
                StreamStatus::Running,
            ));
        }
        self.total_records += 1;

        stream.cursor().observe(&record);
        self.output
            .push_back(OutputMessage::record(name, stream.namespace(), record.data));
        self.output.extend(self.message_repository.drain());
        Ok(())
    }

    /// Emit COMPLETE once discovery has finished and every partition is done.
    fn finalize_if_done(&mut self, stream: &str) {
        if !self.streams_in_progress.contains(stream) || self.running_generators.contains(stream) {
            return;
        }
        let all_done = self
            .partitions_done_by_stream
            .get(stream)
            .is_none_or(|partitions| partitions.values().all(|done| *done));
        if !all_done {
            return;
        }

        self.streams_in_progress.remove(stream);
        self.timer.finish_event(stream);
        let count = self.record_counts.get(stream).copied().unwrap_or_default();
        info!(stream = %stream, records = count, "Read {count} records from {stream} stream");
        info!(stream = %stream, "Marking stream as COMPLETE");

        self.output.extend(self.message_repository.drain());
        let namespace = self.streams.get(stream).and_then(|s| s.namespace());
        self.output.push_back(OutputMessage::stream_status(
            stream,
            namespace,
            StreamStatus::Complete,
        ));
        info!(stream = %stream, "Finished syncing {stream}");
    }

    /// Every generator ran and every partition it produced is done.
    fn all_work_done(&self) -> bool {
        self.pending_generators.is_empty()
            && self.running_generators.is_empty()
            && self.open_partitions == 0
    }

    /// Success path: wait for the last tasks to return, then stop the pool.
    fn finish(&mut self) -> Result<(), SyncError> {
        debug_assert!(self.streams_in_progress.is_empty());
        for handle in std::mem::take(&mut self.outstanding) {
            handle.wait(self.timeout).map_err(|_| SyncError::Stalled {
                timeout: self.timeout,
            })?;
        }
        self.pool.shutdown();

        self.output.extend(self.message_repository.drain());
        info!("{}", self.timer.report());
        info!(
            total_records = self.total_records,
            "Finished syncing {}", self.source_name
        );
        self.phase = Phase::Finished;
        Ok(())
    }

    /// Failure path: stop the pool, mark unfinished streams INCOMPLETE and
    /// raise `error` once the buffered output has been yielded.
    fn abort(&mut self, error: SyncError) {
        error!(error = %error, "Sync failed; cancelling pending work");
        self.pool.cancel_pending_and_stop();
        self.queue = None;
        self.output.extend(self.message_repository.drain());

        for stream in std::mem::take(&mut self.streams_in_progress) {
            info!(stream = %stream, "Marking stream as INCOMPLETE");
            self.timer.finish_event(&stream);
            let namespace = self.streams.get(&stream).and_then(|s| s.namespace());
            self.output.push_back(OutputMessage::stream_status(
                &stream,
                namespace,
                StreamStatus::Incomplete,
            ));
            info!(stream = %stream, "Finished syncing {stream}");
        }

        info!("{}", self.timer.report());
        self.phase = Phase::Raising(error);
    }

    /// Consume one queue item, or finish when nothing is left to wait for.
    fn step(&mut self) {
        if self.all_work_done() {
            if let Err(error) = self.finish() {
                self.abort(error);
            }
            return;
        }

        let Some(queue) = self.queue.as_ref() else {
            self.abort(SyncError::QueueClosed);
            return;
        };
        let outcome = match queue.recv_timeout(self.timeout) {
            Ok(item) => {
                trace!(kind = item.kind(), "Dequeued item");
                self.handle_item(item)
            }
            Err(RecvTimeoutError::Timeout) => Err(SyncError::Stalled {
                timeout: self.timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(SyncError::QueueClosed),
        };
        if let Err(error) = outcome {
            self.abort(error);
        }
    }
}

impl Iterator for SyncRun {
    type Item = Result<OutputMessage, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.span.clone();
        let _entered = span.enter();
        loop {
            if let Some(message) = self.output.pop_front() {
                return Some(Ok(message));
            }
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Finished => return None,
                Phase::Raising(error) => return Some(Err(error)),
                Phase::Running => {
                    self.phase = Phase::Running;
                    self.step();
                }
            }
        }
    }
}

impl Drop for SyncRun {
    fn drop(&mut self) {
        if matches!(self.phase, Phase::Running) {
            let _entered = self.span.enter();
            warn!("Sync dropped before completion; cancelling pending work");
            self.pool.cancel_pending_and_stop();
        }
    }
}
