//! Bounded decode queue, worker pool, and decoder subprocess supervision.

pub mod job;
pub mod process;
pub mod queue;
pub(crate) mod worker;

pub use job::DecodeJob;
pub use queue::{DecoderQueue, QueueConfig};
