//! Audio source abstraction.
//!
//! The pipeline reads demodulated audio from a single [`AudioSource`] and
//! never touches SDR hardware itself. Anything that can produce a blocking
//! stream of raw PCM bytes can drive the chopper.

pub mod source;

pub use source::{AudioSource, MockAudioSource, RawFileSource};
