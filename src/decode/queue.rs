//! Bounded decode queue shared by all segment writers.
//!
//! The queue never blocks the audio path: enqueueing a job when the queue is
//! at capacity fails immediately and the segment is dropped by the caller.
//! A fixed pool of worker threads drains the queue for the life of the
//! process.

use crate::config::Config;
use crate::decode::job::DecodeJob;
use crate::decode::worker;
use crate::metrics::{Counter, Metrics};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::JoinHandle;

/// Sizing of the decode queue and its worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of undispatched jobs.
    pub capacity: usize,
    /// Number of long-lived worker threads. Zero is allowed for tests that
    /// drain the queue manually.
    pub workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: crate::defaults::QUEUE_LENGTH,
            workers: crate::defaults::QUEUE_WORKERS,
        }
    }
}

impl From<&Config> for QueueConfig {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.queue.length,
            workers: config.queue.workers,
        }
    }
}

/// Bounded job queue with a worker pool and full instrumentation.
///
/// Counters satisfy `in - out - overflow == length` at every quiescent point.
pub struct DecoderQueue {
    tx: Mutex<Option<Sender<DecodeJob>>>,
    rx: Receiver<DecodeJob>,
    capacity: usize,
    in_counter: Arc<Counter>,
    out_counter: Arc<Counter>,
    overflow_counter: Arc<Counter>,
    error_counter: Arc<Counter>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DecoderQueue {
    /// Creates a queue and spawns its workers.
    ///
    /// All counters and the length gauge are registered with `metrics` under
    /// the `decoding.queue.*` names.
    pub fn new(config: QueueConfig, metrics: &Metrics) -> Arc<Self> {
        let (tx, rx) = bounded(config.capacity);

        let gauge_rx = rx.clone();
        metrics.register_gauge("decoding.queue.length", move || gauge_rx.len() as i64);

        let queue = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            rx,
            capacity: config.capacity,
            in_counter: metrics.counter("decoding.queue.in"),
            out_counter: metrics.counter("decoding.queue.out"),
            overflow_counter: metrics.counter("decoding.queue.overflow"),
            error_counter: metrics.counter("decoding.queue.error"),
            workers: Mutex::new(Vec::new()),
        });

        let handles: Vec<_> = (0..config.workers)
            .map(|index| worker::spawn(queue.clone(), index))
            .collect();
        *queue.lock_workers() = handles;

        queue
    }

    /// Returns the process-wide shared queue, creating it on first access
    /// from the default configuration (config file plus environment
    /// overrides).
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<DecoderQueue>> = OnceLock::new();
        SHARED
            .get_or_init(|| {
                let config = Config::load_or_default(&Config::default_path()).with_env_overrides();
                DecoderQueue::new(QueueConfig::from(&config), Metrics::shared())
            })
            .clone()
    }

    fn lock_tx(&self) -> MutexGuard<'_, Option<Sender<DecodeJob>>> {
        self.tx.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attempts to enqueue a job without blocking.
    ///
    /// On overflow (or after shutdown) the job is handed back so the caller
    /// can delete its segment file; ownership only transfers on success.
    pub fn enqueue(&self, job: DecodeJob) -> std::result::Result<(), DecodeJob> {
        self.in_counter.inc();
        let guard = self.lock_tx();
        let Some(tx) = guard.as_ref() else {
            return Err(job);
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                self.overflow_counter.inc();
                Err(job)
            }
            Err(TrySendError::Disconnected(job)) => Err(job),
        }
    }

    /// Blocks until a job is available. Returns `None` once the queue has
    /// been shut down and drained.
    pub fn dequeue(&self) -> Option<DecodeJob> {
        let job = self.rx.recv().ok()?;
        self.out_counter.inc();
        Some(job)
    }

    /// Records a worker-level decode failure.
    pub(crate) fn on_error(&self) {
        self.error_counter.inc();
    }

    /// Number of undispatched jobs right now.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Configured capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_count(&self) -> u64 {
        self.in_counter.value()
    }

    pub fn out_count(&self) -> u64 {
        self.out_counter.value()
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_counter.value()
    }

    pub fn error_count(&self) -> u64 {
        self.error_counter.value()
    }

    /// Closes the queue and joins the workers.
    ///
    /// Jobs already queued are still decoded before the workers exit.
    pub fn shutdown(&self) {
        self.lock_tx().take();
        let handles: Vec<_> = self.lock_workers().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("decode worker panicked during shutdown");
            }
        }
    }
}
