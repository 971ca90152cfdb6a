//! Decode jobs: one completed segment file awaiting one decoder run.

use crate::chopper::types::DecodedLine;
use crate::decode::process;
use crate::error::Result;
use crate::profile::DecoderProfile;
use crossbeam_channel::Sender;
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One unit of decode work.
///
/// Immutable once created. Pairs a completed segment file with the profile
/// that must decode it and the frequency that was active while it was
/// recorded. Ownership of the file travels with the job: whoever holds the
/// job last deletes the file.
pub struct DecodeJob {
    profile: Arc<dyn DecoderProfile>,
    file: PathBuf,
    frequency: u64,
    output: Sender<DecodedLine>,
    workdir: PathBuf,
    wait_timeout: Duration,
}

impl DecodeJob {
    pub fn new(
        profile: Arc<dyn DecoderProfile>,
        file: PathBuf,
        frequency: u64,
        output: Sender<DecodedLine>,
        workdir: PathBuf,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            profile,
            file,
            frequency,
            output,
            workdir,
            wait_timeout,
        }
    }

    /// Path of the segment file this job owns.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Operating frequency in Hz recorded with the segment.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// Runs the profile's decoder over the segment, forwarding each output
    /// line to the owning writer's channel as it arrives.
    pub fn run(&self) -> Result<()> {
        debug!("processing file {}", self.file.display());
        let argv = self.profile.decoder_command(&self.file);
        process::run_supervised(&argv, &self.workdir, self.wait_timeout, |text| {
            // The receiving side disappears when the writer is stopped;
            // late output is simply dropped.
            self.output.send(DecodedLine::new(self.frequency, text)).ok();
        })
    }

    /// Removes the segment file. A file that is already gone is not an error.
    pub fn unlink(&self) {
        unlink_segment(&self.file);
    }
}

impl fmt::Debug for DecodeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeJob")
            .field("profile", &self.profile.name())
            .field("file", &self.file)
            .field("frequency", &self.frequency)
            .finish()
    }
}

/// Removes a segment file, logging anything other than "already gone".
pub(crate) fn unlink_segment(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("error removing segment file {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MockProfile;
    use crossbeam_channel::unbounded;
    use std::fs;

    fn job_for(command: Vec<String>, file: PathBuf) -> (DecodeJob, crossbeam_channel::Receiver<DecodedLine>) {
        let (tx, rx) = unbounded();
        let profile = Arc::new(MockProfile::new("mock").with_command(command));
        let job = DecodeJob::new(
            profile,
            file,
            14074000,
            tx,
            std::env::temp_dir(),
            Duration::from_secs(5),
        );
        (job, rx)
    }

    #[test]
    fn test_run_forwards_lines_with_frequency() {
        let (job, rx) = job_for(
            vec!["sh".into(), "-c".into(), "echo alpha; echo beta".into()],
            PathBuf::from("/tmp/unused.wav"),
        );

        job.run().unwrap();

        let lines: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            lines,
            vec![
                DecodedLine::new(14074000, "alpha".to_string()),
                DecodedLine::new(14074000, "beta".to_string()),
            ]
        );
    }

    #[test]
    fn test_run_passes_file_to_decoder() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "segment-contents").unwrap();

        let (job, rx) = job_for(
            vec!["cat".into(), "{file}".into()],
            file.path().to_path_buf(),
        );

        job.run().unwrap();
        let lines: Vec<_> = rx.try_iter().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "segment-contents");
    }

    #[test]
    fn test_run_survives_dropped_receiver() {
        let (job, rx) = job_for(
            vec!["sh".into(), "-c".into(), "echo orphan".into()],
            PathBuf::from("/tmp/unused.wav"),
        );
        drop(rx);

        // Output has nowhere to go; the job still completes.
        assert!(job.run().is_ok());
    }

    #[test]
    fn test_unlink_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.wav");
        fs::write(&path, b"x").unwrap();

        let (job, _rx) = job_for(vec!["true".into()], path.clone());
        job.unlink();
        assert!(!path.exists());
    }

    #[test]
    fn test_unlink_missing_file_is_a_noop() {
        let (job, _rx) = job_for(vec!["true".into()], PathBuf::from("/tmp/never-existed.wav"));
        job.unlink();
        job.unlink();
    }

    #[test]
    fn test_debug_format_names_profile_and_file() {
        let (job, _rx) = job_for(vec!["true".into()], PathBuf::from("/tmp/seg.wav"));
        let debug = format!("{:?}", job);
        assert!(debug.contains("mock"));
        assert!(debug.contains("/tmp/seg.wav"));
    }
}
