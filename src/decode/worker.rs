//! Long-lived decode workers.
//!
//! A worker owns no job state. It pulls one job at a time, runs it to
//! completion, and always removes the job's segment file: success, decoder
//! failure, and timeout all end the same way: file gone, worker alive.

use crate::decode::queue::DecoderQueue;
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Spawns one worker thread draining `queue` until it is shut down.
pub(crate) fn spawn(queue: Arc<DecoderQueue>, index: usize) -> JoinHandle<()> {
    thread::spawn(move || run(&queue, index))
}

fn run(queue: &DecoderQueue, index: usize) {
    debug!("decode worker {} starting", index);
    while let Some(job) = queue.dequeue() {
        if let Err(e) = job.run() {
            warn!("failed to decode {}: {}", job.file().display(), e);
            queue.on_error();
        }
        job.unlink();
    }
    debug!("decode worker {} shutting down", index);
}
