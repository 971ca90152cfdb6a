//! Decoder profiles for the supported digital modes.
//!
//! A profile contributes exactly three things: the segmentation interval, the
//! timestamp format embedded in segment filenames, and the command line of the
//! external decoder. Everything else about a mode lives in the decoder binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Capability interface of one decode target.
///
/// Multiple profiles may be active over the same audio stream at once; each
/// gets its own segment writer. Profiles sharing an interval rotate at the
/// same wall-clock boundaries, so their segments correlate by timestamp.
pub trait DecoderProfile: Send + Sync {
    /// Short mode name, used in logs.
    fn name(&self) -> &str;

    /// Length of one segment. Rotation instants are multiples of this
    /// interval measured from the top of the hour.
    fn interval(&self) -> Duration;

    /// chrono strftime format for the timestamp in segment filenames.
    fn file_timestamp_format(&self) -> &str;

    /// Full argv for decoding one segment file; the first element is the
    /// executable.
    fn decoder_command(&self, file: &Path) -> Vec<String>;
}

/// FT8: 15-second cycles, decoded by the `jt9` binary from WSJT-X.
#[derive(Debug, Clone)]
pub struct Ft8Profile {
    decoder: PathBuf,
    depth: u32,
}

impl Ft8Profile {
    pub fn new() -> Self {
        Self {
            decoder: PathBuf::from("jt9"),
            depth: 3,
        }
    }

    /// Use a specific decoder executable instead of resolving `jt9` from PATH.
    pub fn with_decoder(mut self, decoder: PathBuf) -> Self {
        self.decoder = decoder;
        self
    }

    /// Decoding depth passed to `jt9 -d` (1 = fastest, 3 = most thorough).
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

impl Default for Ft8Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderProfile for Ft8Profile {
    fn name(&self) -> &str {
        "ft8"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(15)
    }

    fn file_timestamp_format(&self) -> &str {
        "%H%M%S"
    }

    fn decoder_command(&self, file: &Path) -> Vec<String> {
        vec![
            self.decoder.to_string_lossy().into_owned(),
            "--ft8".to_string(),
            "-d".to_string(),
            self.depth.to_string(),
            file.to_string_lossy().into_owned(),
        ]
    }
}

/// FT4: 7.5-second cycles, decoded by the `jt9` binary from WSJT-X.
#[derive(Debug, Clone)]
pub struct Ft4Profile {
    decoder: PathBuf,
    depth: u32,
}

impl Ft4Profile {
    pub fn new() -> Self {
        Self {
            decoder: PathBuf::from("jt9"),
            depth: 3,
        }
    }

    pub fn with_decoder(mut self, decoder: PathBuf) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

impl Default for Ft4Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderProfile for Ft4Profile {
    fn name(&self) -> &str {
        "ft4"
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(7500)
    }

    fn file_timestamp_format(&self) -> &str {
        "%H%M%S"
    }

    fn decoder_command(&self, file: &Path) -> Vec<String> {
        vec![
            self.decoder.to_string_lossy().into_owned(),
            "--ft4".to_string(),
            "-d".to_string(),
            self.depth.to_string(),
            file.to_string_lossy().into_owned(),
        ]
    }
}

/// JT65: one-minute cycles, decoded by the `jt9` binary from WSJT-X.
#[derive(Debug, Clone)]
pub struct Jt65Profile {
    decoder: PathBuf,
    depth: u32,
}

impl Jt65Profile {
    pub fn new() -> Self {
        Self {
            decoder: PathBuf::from("jt9"),
            depth: 3,
        }
    }

    pub fn with_decoder(mut self, decoder: PathBuf) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

impl Default for Jt65Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderProfile for Jt65Profile {
    fn name(&self) -> &str {
        "jt65"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn file_timestamp_format(&self) -> &str {
        "%H%M"
    }

    fn decoder_command(&self, file: &Path) -> Vec<String> {
        vec![
            self.decoder.to_string_lossy().into_owned(),
            "--jt65".to_string(),
            "-d".to_string(),
            self.depth.to_string(),
            file.to_string_lossy().into_owned(),
        ]
    }
}

/// JT9: one-minute cycles, decoded by the `jt9` binary from WSJT-X.
#[derive(Debug, Clone)]
pub struct Jt9Profile {
    decoder: PathBuf,
    depth: u32,
}

impl Jt9Profile {
    pub fn new() -> Self {
        Self {
            decoder: PathBuf::from("jt9"),
            depth: 3,
        }
    }

    pub fn with_decoder(mut self, decoder: PathBuf) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

impl Default for Jt9Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderProfile for Jt9Profile {
    fn name(&self) -> &str {
        "jt9"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn file_timestamp_format(&self) -> &str {
        "%H%M"
    }

    fn decoder_command(&self, file: &Path) -> Vec<String> {
        vec![
            self.decoder.to_string_lossy().into_owned(),
            "--jt9".to_string(),
            "-d".to_string(),
            self.depth.to_string(),
            file.to_string_lossy().into_owned(),
        ]
    }
}

/// WSPR: two-minute cycles, decoded by the `wsprd` binary.
#[derive(Debug, Clone)]
pub struct WsprProfile {
    decoder: PathBuf,
    deep_search: bool,
}

impl WsprProfile {
    pub fn new() -> Self {
        Self {
            decoder: PathBuf::from("wsprd"),
            deep_search: false,
        }
    }

    pub fn with_decoder(mut self, decoder: PathBuf) -> Self {
        self.decoder = decoder;
        self
    }

    /// Enable wsprd's deeper search pass (slower, more decodes).
    pub fn with_deep_search(mut self, enabled: bool) -> Self {
        self.deep_search = enabled;
        self
    }
}

impl Default for WsprProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderProfile for WsprProfile {
    fn name(&self) -> &str {
        "wspr"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(120)
    }

    fn file_timestamp_format(&self) -> &str {
        "%H%M"
    }

    fn decoder_command(&self, file: &Path) -> Vec<String> {
        let mut cmd = vec![self.decoder.to_string_lossy().into_owned()];
        if self.deep_search {
            cmd.push("-d".to_string());
        }
        cmd.push(file.to_string_lossy().into_owned());
        cmd
    }
}

/// Mock profile for testing
///
/// The command is a template; every occurrence of `{file}` in an argument is
/// replaced with the segment path.
#[derive(Debug, Clone)]
pub struct MockProfile {
    name: String,
    interval: Duration,
    timestamp_format: String,
    command: Vec<String>,
}

impl MockProfile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interval: Duration::from_secs(15),
            timestamp_format: "%H%M%S".to_string(),
            command: vec!["true".to_string()],
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }
}

impl DecoderProfile for MockProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn file_timestamp_format(&self) -> &str {
        &self.timestamp_format
    }

    fn decoder_command(&self, file: &Path) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| arg.replace("{file}", &file.to_string_lossy()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ft8_interval_and_format() {
        let profile = Ft8Profile::new();
        assert_eq!(profile.interval(), Duration::from_secs(15));
        assert_eq!(profile.file_timestamp_format(), "%H%M%S");
        assert_eq!(profile.name(), "ft8");
    }

    #[test]
    fn test_ft4_interval_is_fractional() {
        let profile = Ft4Profile::new();
        assert_eq!(profile.interval(), Duration::from_millis(7500));
    }

    #[test]
    fn test_minute_cycle_modes_use_minute_timestamps() {
        assert_eq!(Jt65Profile::new().file_timestamp_format(), "%H%M");
        assert_eq!(Jt9Profile::new().file_timestamp_format(), "%H%M");
        assert_eq!(WsprProfile::new().file_timestamp_format(), "%H%M");
        assert_eq!(Jt65Profile::new().interval(), Duration::from_secs(60));
        assert_eq!(Jt9Profile::new().interval(), Duration::from_secs(60));
        assert_eq!(WsprProfile::new().interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_jt65_and_jt9_share_binary_with_different_modes() {
        let jt65 = Jt65Profile::new().decoder_command(Path::new("/tmp/seg.wav"));
        let jt9 = Jt9Profile::new().decoder_command(Path::new("/tmp/seg.wav"));
        assert_eq!(jt65[0], "jt9");
        assert_eq!(jt9[0], "jt9");
        assert!(jt65.contains(&"--jt65".to_string()));
        assert!(jt9.contains(&"--jt9".to_string()));
    }

    #[test]
    fn test_ft8_command_contains_mode_and_file() {
        let profile = Ft8Profile::new().with_depth(2);
        let cmd = profile.decoder_command(Path::new("/tmp/seg.wav"));
        assert_eq!(cmd[0], "jt9");
        assert!(cmd.contains(&"--ft8".to_string()));
        assert!(cmd.contains(&"2".to_string()));
        assert_eq!(cmd.last().unwrap(), "/tmp/seg.wav");
    }

    #[test]
    fn test_custom_decoder_path() {
        let profile = Ft8Profile::new().with_decoder(PathBuf::from("/opt/wsjtx/bin/jt9"));
        let cmd = profile.decoder_command(Path::new("/tmp/seg.wav"));
        assert_eq!(cmd[0], "/opt/wsjtx/bin/jt9");
    }

    #[test]
    fn test_wspr_deep_search_flag() {
        let shallow = WsprProfile::new().decoder_command(Path::new("/tmp/seg.wav"));
        assert_eq!(shallow, vec!["wsprd", "/tmp/seg.wav"]);

        let deep = WsprProfile::new()
            .with_deep_search(true)
            .decoder_command(Path::new("/tmp/seg.wav"));
        assert_eq!(deep, vec!["wsprd", "-d", "/tmp/seg.wav"]);
    }

    #[test]
    fn test_mock_profile_replaces_file_placeholder() {
        let profile = MockProfile::new("test").with_command(vec![
            "cat".to_string(),
            "{file}".to_string(),
        ]);
        let cmd = profile.decoder_command(Path::new("/tmp/x.wav"));
        assert_eq!(cmd, vec!["cat", "/tmp/x.wav"]);
    }

    #[test]
    fn test_profiles_are_usable_as_trait_objects() {
        let profiles: Vec<Arc<dyn DecoderProfile>> = vec![
            Arc::new(Ft8Profile::new()),
            Arc::new(Ft4Profile::new()),
            Arc::new(Jt65Profile::new()),
            Arc::new(Jt9Profile::new()),
            Arc::new(WsprProfile::new()),
            Arc::new(MockProfile::new("mock")),
        ];
        for profile in &profiles {
            assert!(!profile.name().is_empty());
            assert!(profile.interval() > Duration::ZERO);
        }
    }
}
