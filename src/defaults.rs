//! Default configuration constants for sigchop.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default segment sample rate in Hz.
///
/// 12 kHz is the rate the common digital-mode decoders (jt9, wsprd) expect
/// for their WAV input, and comfortably covers the ~3 kHz audio passband of
/// an SSB channel.
pub const SAMPLE_RATE: u32 = 12000;

/// Bits per sample in a segment file. Segments are signed 16-bit PCM.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Channels in a segment file. Demodulated audio is mono.
pub const CHANNELS: u16 = 1;

/// Number of bytes read from the audio source per fan-out iteration.
///
/// Small enough to keep segment boundaries close to the rotation instant,
/// large enough to keep per-chunk overhead negligible.
pub const READ_CHUNK_BYTES: usize = 256;

/// Default bound on the number of undispatched decode jobs.
///
/// Once the queue holds this many jobs, further segments are dropped rather
/// than blocking the audio path.
pub const QUEUE_LENGTH: usize = 10;

/// Default number of decode worker threads.
pub const QUEUE_WORKERS: usize = 2;

/// Seconds to wait for a decoder process to exit after its output ends.
///
/// A decoder that is still running after this bound is killed.
pub const DECODER_TIMEOUT_SECS: u64 = 10;

/// Niceness applied to decoder subprocesses.
///
/// Decoding runs at a lower scheduling priority than the live audio path.
pub const DECODER_NICENESS: i32 = 10;

/// Default maximum number of simultaneously connected clients.
pub const MAX_CLIENTS: usize = 20;

/// Default directory for in-progress segment files.
pub const TEMPORARY_DIRECTORY: &str = "/tmp";
