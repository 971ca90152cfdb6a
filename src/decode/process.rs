//! Supervised execution of decoder subprocesses.
//!
//! A decoder is spawned at lowered scheduling priority with its stdout piped.
//! Output is streamed line-by-line as it arrives. After the stream ends the
//! process gets a bounded grace period to exit; overstaying it means a kill.

use crate::defaults;
use crate::error::{Result, SigchopError};
use log::warn;
use std::io::{BufRead, BufReader};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// How often the exit poll checks on a decoder that has closed its output.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs one decoder invocation to completion.
///
/// `on_line` is called for every line of standard output as it arrives.
/// A non-zero exit status and an exit timeout (followed by a kill) are both
/// logged and treated as handled; only failing to start the process at all is
/// an error.
pub fn run_supervised<F>(
    argv: &[String],
    workdir: &Path,
    wait_timeout: Duration,
    mut on_line: F,
) -> Result<()>
where
    F: FnMut(String),
{
    let (program, args) = argv.split_first().ok_or_else(|| SigchopError::Decode {
        message: "empty decoder command line".to_string(),
    })?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped());
    // SAFETY: lower_priority only calls nice(), which is async-signal-safe.
    unsafe {
        command.pre_exec(lower_priority);
    }

    let mut child = command.spawn().map_err(|e| SigchopError::Decode {
        message: format!("Failed to spawn {}: {}", program, e),
    })?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => on_line(line),
                Err(e) => {
                    warn!("error reading decoder output: {}", e);
                    break;
                }
            }
        }
    }

    match wait_with_timeout(&mut child, wait_timeout) {
        Ok(Some(status)) if !status.success() => {
            warn!("decoder exited with {}", status);
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(
                "decoder (pid {}) did not exit within {:?}; sending kill signal",
                child.id(),
                wait_timeout
            );
            if let Err(e) = child.kill() {
                warn!("failed to kill decoder (pid {}): {}", child.id(), e);
            }
            // Reap the killed process so it does not linger as a zombie.
            if let Err(e) = child.wait() {
                warn!("failed to reap decoder (pid {}): {}", child.id(), e);
            }
        }
        Err(e) => {
            warn!("failed waiting for decoder (pid {}): {}", child.id(), e);
        }
    }

    Ok(())
}

/// Runs in the forked child before exec: drop the decoder below the audio
/// path's scheduling priority.
fn lower_priority() -> std::io::Result<()> {
    // SAFETY: plain syscall wrapper, no allocation, async-signal-safe.
    unsafe {
        libc::nice(defaults::DECODER_NICENESS);
    }
    Ok(())
}

/// Waits for the child to exit, giving up after `timeout`.
///
/// Returns `Ok(None)` on timeout; the caller decides what to do with the
/// still-running process.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
}
