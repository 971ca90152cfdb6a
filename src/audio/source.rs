use crate::error::{Result, SigchopError};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Trait for demodulated audio sources.
///
/// This trait allows swapping implementations (live demodulator vs file vs mock).
pub trait AudioSource: Send {
    /// Read the next chunk of raw PCM bytes, blocking until data is available.
    ///
    /// Returns at most `max_bytes` bytes. An empty vector signals
    /// end-of-stream; the fan-out loop stops on it.
    fn read_chunk(&mut self, max_bytes: usize) -> Result<Vec<u8>>;
}

/// Mock audio source for testing
pub struct MockAudioSource {
    chunks: VecDeque<Vec<u8>>,
    read_delay: Option<Duration>,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with no queued chunks
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            read_delay: None,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to return the given chunks in order, then end-of-stream
    pub fn with_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.chunks = chunks.into();
        self
    }

    /// Configure the mock to return `count` copies of `chunk`, then end-of-stream
    pub fn with_repeated_chunk(mut self, chunk: Vec<u8>, count: usize) -> Self {
        self.chunks = std::iter::repeat_n(chunk, count).collect();
        self
    }

    /// Configure a delay before each read, simulating a real-time source
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Configure the mock to fail on read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Number of chunks not yet consumed
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn read_chunk(&mut self, _max_bytes: usize) -> Result<Vec<u8>> {
        if self.should_fail_read {
            return Err(SigchopError::AudioSource {
                message: self.error_message.clone(),
            });
        }
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }
        Ok(self.chunks.pop_front().unwrap_or_default())
    }
}

/// Audio source reading raw little-endian 16-bit PCM from a file.
///
/// Yields the file contents in `max_bytes` chunks and signals end-of-stream
/// once the file is exhausted. Used for replaying recorded baseband audio.
pub struct RawFileSource {
    reader: BufReader<File>,
}

impl RawFileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SigchopError::AudioSource {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }
}

impl AudioSource for RawFileSource {
    fn read_chunk(&mut self, max_bytes: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let n = self.reader.read(&mut buf).map_err(|e| SigchopError::AudioSource {
            message: format!("Read failed: {}", e),
        })?;
        buf.truncate(n);
        Ok(buf)
    }
}
