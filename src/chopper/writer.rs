//! Segment writer: buffers one profile's audio into wall-clock-aligned WAV
//! segments and hands each completed segment to the decode queue.
//!
//! The active file handle is swapped under a lock while the audio thread may
//! be writing, so rotation never tears a write. The lock is scoped to the
//! append and the swap; it is never held across subprocess or queue waits.

use crate::chopper::rotation::{self, Clock, SystemClock};
use crate::chopper::types::{DecodedLine, FrequencySource};
use crate::decode::job::{DecodeJob, unlink_segment};
use crate::decode::queue::DecoderQueue;
use crate::defaults;
use crate::error::Result;
use crate::profile::DecoderProfile;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, warn};
use std::fs::File;
use std::io::BufWriter;
use std::mem;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Monotonic id so concurrent writers never collide on filenames.
static NEXT_WRITER_ID: AtomicU64 = AtomicU64::new(0);

/// Per-writer settings.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Directory for in-progress segment files; also the decoder's cwd.
    pub tmp_dir: PathBuf,
    /// Segment sample rate in Hz.
    pub sample_rate: u32,
    /// Grace period for a decoder to exit after its output ends.
    pub decoder_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            tmp_dir: PathBuf::from(defaults::TEMPORARY_DIRECTORY),
            sample_rate: defaults::SAMPLE_RATE,
            decoder_timeout: Duration::from_secs(defaults::DECODER_TIMEOUT_SECS),
        }
    }
}

impl From<&crate::config::Config> for WriterConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            tmp_dir: config.segment.temporary_directory.clone(),
            sample_rate: config.segment.sample_rate,
            decoder_timeout: Duration::from_secs(config.decoder.timeout_secs),
        }
    }
}

/// The segment currently being written.
struct ActiveSegment {
    path: PathBuf,
    wav: WavWriter<BufWriter<File>>,
}

/// Handle to the rotation timer thread.
struct RotationTimer {
    cancel_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns one rotating segment file for one profile.
pub struct SegmentWriter {
    id: u64,
    profile: Arc<dyn DecoderProfile>,
    frequency: Arc<dyn FrequencySource>,
    queue: Arc<DecoderQueue>,
    clock: Arc<dyn Clock>,
    config: WriterConfig,
    active: Mutex<Option<ActiveSegment>>,
    timer: Mutex<Option<RotationTimer>>,
    output_tx: Mutex<Option<Sender<DecodedLine>>>,
    output_rx: Receiver<DecodedLine>,
}

impl SegmentWriter {
    pub fn new(
        profile: Arc<dyn DecoderProfile>,
        frequency: Arc<dyn FrequencySource>,
        queue: Arc<DecoderQueue>,
        config: WriterConfig,
    ) -> Self {
        let (output_tx, output_rx) = unbounded();
        Self {
            id: NEXT_WRITER_ID.fetch_add(1, Ordering::Relaxed),
            profile,
            frequency,
            queue,
            clock: Arc::new(SystemClock),
            config,
            active: Mutex::new(None),
            timer: Mutex::new(None),
            output_tx: Mutex::new(Some(output_tx)),
            output_rx,
        }
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Unique id of this writer, embedded in its segment filenames.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receiver carrying this writer's decoded output.
    ///
    /// The channel disconnects once the writer is stopped and the last
    /// in-flight job for it has finished.
    pub fn output(&self) -> Receiver<DecodedLine> {
        self.output_rx.clone()
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSegment>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<RotationTimer>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_output(&self) -> MutexGuard<'_, Option<Sender<DecodedLine>>> {
        self.output_tx.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_segment(&self) -> Result<ActiveSegment> {
        let timestamp = self
            .clock
            .now_utc()
            .format(self.profile.file_timestamp_format())
            .to_string();
        let path = self
            .config
            .tmp_dir
            .join(format!("sigchop-chopper-{}-{}.wav", self.id, timestamp));
        let spec = WavSpec {
            channels: defaults::CHANNELS,
            sample_rate: self.config.sample_rate,
            bits_per_sample: defaults::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };
        let wav = WavWriter::create(&path, spec)?;
        Ok(ActiveSegment { path, wav })
    }

    /// Opens segment #0 and schedules the first rotation.
    ///
    /// Takes an `Arc` receiver because the rotation timer thread keeps its
    /// own handle to the writer; clone the `Arc` when starting.
    pub fn start(self: Arc<Self>) -> Result<()> {
        let first = self.open_segment()?;
        *self.lock_active() = Some(first);

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let writer = Arc::clone(&self);
        let handle = thread::spawn(move || {
            loop {
                let delay = rotation::delay_until_rotation(
                    writer.clock.now_utc(),
                    writer.profile.interval(),
                );
                debug!("{}: next rotation in {:?}", writer.profile.name(), delay);
                match cancel_rx.recv_timeout(delay) {
                    Err(RecvTimeoutError::Timeout) => writer.rotate(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        *self.lock_timer() = Some(RotationTimer { cancel_tx, handle });
        Ok(())
    }

    /// Appends raw little-endian 16-bit PCM bytes to the active segment.
    ///
    /// Safe to call from the audio thread while rotation runs on the timer
    /// thread. Audio arriving before `start()` or after `stop()` is dropped.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.lock_active();
        let Some(active) = guard.as_mut() else {
            return Ok(());
        };
        for sample in data.chunks_exact(2) {
            active
                .wav
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
        }
        Ok(())
    }

    /// Closes the active segment, hands it to the decode queue, and swaps in
    /// the next one. Runs on the rotation timer thread.
    pub(crate) fn rotate(&self) {
        let next = match self.open_segment() {
            Ok(segment) => segment,
            Err(e) => {
                // Keep writing the current segment; the next boundary retries.
                warn!(
                    "{}: failed to open next segment: {}",
                    self.profile.name(),
                    e
                );
                return;
            }
        };

        let finished = {
            let mut guard = self.lock_active();
            mem::replace(&mut *guard, Some(next))
        };

        let Some(ActiveSegment { path, wav }) = finished else {
            return;
        };

        if let Err(e) = wav.finalize() {
            warn!(
                "{}: failed to finalize segment {}: {}",
                self.profile.name(),
                path.display(),
                e
            );
            unlink_segment(&path);
            return;
        }

        self.enqueue_segment(path);
    }

    fn enqueue_segment(&self, path: PathBuf) {
        let output = match self.lock_output().as_ref() {
            Some(tx) => tx.clone(),
            None => {
                // Stopped; nothing downstream wants this segment anymore.
                unlink_segment(&path);
                return;
            }
        };

        let job = DecodeJob::new(
            self.profile.clone(),
            path,
            self.frequency.operating_frequency(),
            output,
            self.config.tmp_dir.clone(),
            self.config.decoder_timeout,
        );
        if let Err(job) = self.queue.enqueue(job) {
            warn!("decoding queue overflow; dropping one file");
            job.unlink();
        }
    }

    /// Stops the writer.
    ///
    /// Cancels the rotation timer, closes the output channel, and deletes the
    /// in-progress segment, which was never enqueued and must not leak.
    /// Idempotent; deletion failures are logged, never fatal.
    pub fn stop(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.cancel_tx.send(()).ok();
            if timer.handle.join().is_err() {
                warn!("{}: rotation timer thread panicked", self.profile.name());
            }
        }

        self.lock_output().take();

        if let Some(ActiveSegment { path, wav }) = self.lock_active().take() {
            wav.finalize().ok();
            unlink_segment(&path);
        }
    }
}
