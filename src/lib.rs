//! sigchop - Audio segmentation and decode pipeline for SDR receivers
//!
//! Slices a continuous demodulated audio stream into wall-clock-aligned WAV
//! segments per decoder profile, runs external decoders over completed
//! segments through a bounded worker pool, and multiplexes the decoded
//! output back to a single consumer.

// Error handling discipline: decode-path failures are contained, not propagated.
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod chopper;
pub mod config;
pub mod decode;
pub mod defaults;
pub mod error;
pub mod metrics;
pub mod profile;
pub mod registry;

// Core traits (source → chop → decode → sink)
pub use audio::{AudioSource, MockAudioSource, RawFileSource};
pub use chopper::{Clock, FixedFrequency, FrequencySource, ManualClock, SystemClock};
pub use profile::{
    DecoderProfile, Ft4Profile, Ft8Profile, Jt9Profile, Jt65Profile, MockProfile, WsprProfile,
};
pub use registry::{Client, ClientRegistry, RegistryConfig};

// Pipeline
pub use chopper::{AudioChopper, ChopperConfig, DecodedLine, SegmentWriter, WriterConfig};
pub use decode::{DecodeJob, DecoderQueue, QueueConfig};

// Error handling
pub use error::{Result, SigchopError};

// Config and metrics
pub use config::Config;
pub use metrics::{Counter, Metric, Metrics};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
