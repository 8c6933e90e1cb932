//! Shared output channel between workers and result consumers.

use crate::acoustics::Spectrum;
use crate::engine::config::EngineConfig;
use crate::propagation::path::AttenuationPath;
use crate::Point;
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Wait between capacity checks when the output queues are full.
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Worker-side view of run progress and cancellation.
pub trait ProgressCallback: Send + Sync {
    /// One receiver finished.
    fn step(&self) {}
    /// The run is being torn down.
    fn cancel(&self) {}
    /// True when an external party asked to stop.
    fn is_canceled(&self) -> bool {
        false
    }
}

/// Callback that ignores progress and never cancels.
pub struct NoProgress;

impl ProgressCallback for NoProgress {}

/// Levels received at one receiver, in dB per octave band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverLevel {
    /// External receiver identifier.
    pub receiver: i64,
    /// External source identifier, -1 when sources are merged.
    pub source: i64,
    /// Receiver position.
    pub position: Point,
    /// Received level per band (dB).
    pub levels: Spectrum,
}

/// Bounded multi-queue channel shared by all workers.
///
/// Workers push finished records, a consumer drains them. `queue_size`
/// counts records across every queue; once it passes the configured bound,
/// producers poll until the consumer catches up or the run aborts.
pub struct OutputChannel {
    pub day_levels: SegQueue<ReceiverLevel>,
    pub evening_levels: SegQueue<ReceiverLevel>,
    pub night_levels: SegQueue<ReceiverLevel>,
    pub den_levels: SegQueue<ReceiverLevel>,
    pub paths: SegQueue<AttenuationPath>,
    memory_paths: Mutex<Vec<AttenuationPath>>,
    /// Records currently sitting in the queues.
    pub queue_size: AtomicUsize,
    /// Cut planes that produced a path, across the whole run.
    pub path_count: AtomicUsize,
    paths_inserted: AtomicUsize,
    memory_paths_size: AtomicUsize,
    aborted: AtomicBool,
    output_maximum_queue: usize,
    maximum_paths_count: usize,
}

impl OutputChannel {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            day_levels: SegQueue::new(),
            evening_levels: SegQueue::new(),
            night_levels: SegQueue::new(),
            den_levels: SegQueue::new(),
            paths: SegQueue::new(),
            memory_paths: Mutex::new(Vec::new()),
            queue_size: AtomicUsize::new(0),
            path_count: AtomicUsize::new(0),
            paths_inserted: AtomicUsize::new(0),
            memory_paths_size: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            output_maximum_queue: config.output_maximum_queue,
            maximum_paths_count: config.maximum_paths_count,
        }
    }

    /// Asks every producer to stop at the next opportunity.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Blocks until the queues have room. False when the run aborted or was
    /// canceled while waiting.
    fn wait_for_capacity(&self, progress: &dyn ProgressCallback) -> bool {
        while self.queue_size.load(Ordering::SeqCst) > self.output_maximum_queue {
            thread::sleep(QUEUE_POLL_INTERVAL);
            if self.is_aborted() || progress.is_canceled() {
                tracing::debug!("stop observed while waiting for output queue capacity");
                progress.cancel();
                return false;
            }
        }
        true
    }

    /// Pushes one level record into the given queue, honouring the bound.
    pub fn push_level(
        &self,
        queue: &SegQueue<ReceiverLevel>,
        record: ReceiverLevel,
        progress: &dyn ProgressCallback,
    ) {
        if !self.wait_for_capacity(progress) {
            return;
        }
        queue.push(record);
        self.queue_size.fetch_add(1, Ordering::SeqCst);
    }

    /// Pushes a batch of paths into the path queue, honouring the bound and
    /// the run-wide path cap.
    pub fn push_paths(&self, mut batch: Vec<AttenuationPath>, progress: &dyn ProgressCallback) {
        if batch.is_empty() || !self.wait_for_capacity(progress) {
            return;
        }
        if self.maximum_paths_count > 0 {
            if self.paths_inserted.load(Ordering::SeqCst) >= self.maximum_paths_count {
                return;
            }
            let total = self.paths_inserted.fetch_add(batch.len(), Ordering::SeqCst) + batch.len();
            if total > self.maximum_paths_count {
                let excess = (total - self.maximum_paths_count).min(batch.len());
                batch.truncate(batch.len() - excess);
                tracing::warn!(
                    cap = self.maximum_paths_count,
                    dropped = excess,
                    "path export reached its cap, dropping the excess"
                );
            }
        } else {
            self.paths_inserted.fetch_add(batch.len(), Ordering::SeqCst);
        }
        let pushed = batch.len();
        for path in batch {
            self.paths.push(path);
        }
        self.queue_size.fetch_add(pushed, Ordering::SeqCst);
    }

    /// Appends a batch of paths to the in-memory store, honouring the cap.
    pub fn store_paths_in_memory(&self, mut batch: Vec<AttenuationPath>) {
        if batch.is_empty() {
            return;
        }
        if self.maximum_paths_count > 0 {
            if self.memory_paths_size.load(Ordering::SeqCst) >= self.maximum_paths_count {
                return;
            }
            let total =
                self.memory_paths_size.fetch_add(batch.len(), Ordering::SeqCst) + batch.len();
            if total > self.maximum_paths_count {
                let excess = (total - self.maximum_paths_count).min(batch.len());
                batch.truncate(batch.len() - excess);
            }
        } else {
            self.memory_paths_size.fetch_add(batch.len(), Ordering::SeqCst);
        }
        self.memory_paths.lock().extend(batch);
    }

    /// Takes everything one level queue currently holds.
    pub fn drain_levels(&self, queue: &SegQueue<ReceiverLevel>) -> Vec<ReceiverLevel> {
        let mut out = Vec::new();
        while let Some(record) = queue.pop() {
            out.push(record);
            self.queue_size.fetch_sub(1, Ordering::SeqCst);
        }
        out
    }

    /// Takes everything the path queue currently holds.
    pub fn drain_paths(&self) -> Vec<AttenuationPath> {
        let mut out = Vec::new();
        while let Some(path) = self.paths.pop() {
            out.push(path);
            self.queue_size.fetch_sub(1, Ordering::SeqCst);
        }
        out
    }

    /// Takes the in-memory path store.
    pub fn take_memory_paths(&self) -> Vec<AttenuationPath> {
        std::mem::take(&mut *self.memory_paths.lock())
    }
}
