//! Audio chopper: fan-out driver and output multiplexer.
//!
//! One thread reads the live audio source and forwards every chunk to each
//! active segment writer. Decoded output flows back per-writer; [`AudioChopper::read`]
//! merges those channels into a single consumer-facing call.

pub mod rotation;
pub mod types;
pub mod writer;

pub use rotation::{Clock, ManualClock, SystemClock, next_rotation_time};
pub use types::{DecodedLine, FixedFrequency, FrequencySource};
pub use writer::{SegmentWriter, WriterConfig};

use crate::audio::AudioSource;
use crate::decode::queue::DecoderQueue;
use crate::defaults;
use crate::error::Result;
use crate::profile::DecoderProfile;
use crossbeam_channel::{Receiver, Select, TryRecvError};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Settings for the fan-out driver.
#[derive(Debug, Clone)]
pub struct ChopperConfig {
    /// Bytes read from the audio source per iteration.
    pub chunk_bytes: usize,
    /// Settings shared by all writers this chopper creates.
    pub writer: WriterConfig,
}

impl Default for ChopperConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: defaults::READ_CHUNK_BYTES,
            writer: WriterConfig::default(),
        }
    }
}

impl From<&crate::config::Config> for ChopperConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            chunk_bytes: config.segment.chunk_bytes,
            writer: WriterConfig::from(config),
        }
    }
}

/// Single reader of the audio stream, broadcaster to N writers, and
/// multiplexer of their decoded output.
pub struct AudioChopper {
    writers: Vec<Arc<SegmentWriter>>,
    outputs: Vec<Receiver<DecodedLine>>,
    chunk_bytes: usize,
    running: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl AudioChopper {
    /// Creates one segment writer per profile, all fed from the same stream.
    pub fn new(
        profiles: Vec<Arc<dyn DecoderProfile>>,
        frequency: Arc<dyn FrequencySource>,
        queue: Arc<DecoderQueue>,
        config: ChopperConfig,
    ) -> Self {
        let writers: Vec<Arc<SegmentWriter>> = profiles
            .into_iter()
            .map(|profile| {
                Arc::new(SegmentWriter::new(
                    profile,
                    frequency.clone(),
                    queue.clone(),
                    config.writer.clone(),
                ))
            })
            .collect();
        let outputs = writers.iter().map(|w| w.output()).collect();
        Self {
            writers,
            outputs,
            chunk_bytes: config.chunk_bytes,
            running: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
        }
    }

    fn lock_reader(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reader.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The writers this chopper drives.
    pub fn writers(&self) -> &[Arc<SegmentWriter>] {
        &self.writers
    }

    /// Starts every writer and spawns the fan-out thread.
    ///
    /// The thread runs until the source signals end-of-stream (an empty read)
    /// or fails, then stops all writers.
    pub fn start(&self, mut source: Box<dyn AudioSource>) -> Result<()> {
        for (index, writer) in self.writers.iter().enumerate() {
            if let Err(e) = writer.clone().start() {
                for started in &self.writers[..index] {
                    started.stop();
                }
                return Err(e);
            }
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let writers = self.writers.clone();
        let chunk_bytes = self.chunk_bytes;

        let handle = thread::spawn(move || {
            debug!("audio chopper starting up");
            while running.load(Ordering::SeqCst) {
                let chunk = match source.read_chunk(chunk_bytes) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!("audio source read failed: {}", e);
                        break;
                    }
                };
                if chunk.is_empty() {
                    // End of stream.
                    break;
                }
                for writer in &writers {
                    if let Err(e) = writer.write(&chunk) {
                        warn!("segment write failed: {}", e);
                    }
                }
            }
            debug!("audio chopper shutting down");
            for writer in &writers {
                writer.stop();
            }
            running.store(false, Ordering::SeqCst);
        });

        *self.lock_reader() = Some(handle);
        Ok(())
    }

    /// Returns true while the fan-out thread is consuming the source.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Blocks until decoded output is available on any writer's channel,
    /// drains every ready channel, and returns the batch.
    ///
    /// Returns `None` once all output channels have closed: every writer is
    /// stopped and its last in-flight decode has finished. Batches interleave
    /// writers arbitrarily; only per-writer order is meaningful.
    pub fn read(&self) -> Option<Vec<DecodedLine>> {
        loop {
            let mut batch = Vec::new();
            let mut waitable = Vec::new();
            for rx in &self.outputs {
                loop {
                    match rx.try_recv() {
                        Ok(line) => batch.push(line),
                        Err(TryRecvError::Empty) => {
                            waitable.push(rx);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => break,
                    }
                }
            }

            if !batch.is_empty() {
                return Some(batch);
            }
            if waitable.is_empty() {
                return None;
            }

            // Nothing buffered: wait for any channel to become ready, then
            // drain again.
            let mut select = Select::new();
            for rx in &waitable {
                select.recv(rx);
            }
            select.ready();
        }
    }

    /// Stops the fan-out thread and all writers.
    ///
    /// Called automatically at end-of-stream; calling it while a blocking
    /// source is mid-read detaches the reader thread after a short deadline
    /// rather than hanging.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.lock_reader().take() {
            let deadline = Instant::now() + Duration::from_secs(1);
            loop {
                if handle.is_finished() {
                    if handle.join().is_err() {
                        warn!("audio fan-out thread panicked");
                    }
                    break;
                }
                if Instant::now() >= deadline {
                    warn!("audio source still blocking; detaching fan-out thread");
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }

        for writer in &self.writers {
            writer.stop();
        }
    }
}
