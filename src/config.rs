use crate::defaults;
use crate::error::{Result, SigchopError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub segment: SegmentConfig,
    pub queue: QueueSettings,
    pub decoder: DecoderSettings,
    pub clients: ClientSettings,
}

/// Segment writer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentConfig {
    pub temporary_directory: PathBuf,
    pub sample_rate: u32,
    pub chunk_bytes: usize,
}

/// Decode queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueSettings {
    pub length: usize,
    pub workers: usize,
}

/// Decoder subprocess configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderSettings {
    pub timeout_secs: u64,
}

/// Client admission configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    pub max_clients: usize,
    pub log_connections: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            temporary_directory: PathBuf::from(defaults::TEMPORARY_DIRECTORY),
            sample_rate: defaults::SAMPLE_RATE,
            chunk_bytes: defaults::READ_CHUNK_BYTES,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            length: defaults::QUEUE_LENGTH,
            workers: defaults::QUEUE_WORKERS,
        }
    }
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::DECODER_TIMEOUT_SECS,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_clients: defaults::MAX_CLIENTS,
            log_connections: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SIGCHOP_TMP_DIR → segment.temporary_directory
    /// - SIGCHOP_QUEUE_LENGTH → queue.length
    /// - SIGCHOP_QUEUE_WORKERS → queue.workers
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("SIGCHOP_TMP_DIR")
            && !dir.is_empty()
        {
            self.segment.temporary_directory = PathBuf::from(dir);
        }

        if let Ok(length) = std::env::var("SIGCHOP_QUEUE_LENGTH")
            && let Ok(length) = length.parse()
        {
            self.queue.length = length;
        }

        if let Ok(workers) = std::env::var("SIGCHOP_QUEUE_WORKERS")
            && let Ok(workers) = workers.parse()
        {
            self.queue.workers = workers;
        }

        self
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue.length == 0 {
            return Err(SigchopError::ConfigInvalidValue {
                key: "queue.length".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.queue.workers == 0 {
            return Err(SigchopError::ConfigInvalidValue {
                key: "queue.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.segment.sample_rate == 0 {
            return Err(SigchopError::ConfigInvalidValue {
                key: "segment.sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.segment.chunk_bytes == 0 {
            return Err(SigchopError::ConfigInvalidValue {
                key: "segment.chunk_bytes".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/sigchop/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("sigchop")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.segment.sample_rate, 12000);
        assert_eq!(config.segment.chunk_bytes, 256);
        assert_eq!(config.segment.temporary_directory, PathBuf::from("/tmp"));
        assert_eq!(config.queue.length, 10);
        assert_eq!(config.queue.workers, 2);
        assert_eq!(config.decoder.timeout_secs, 10);
        assert_eq!(config.clients.max_clients, 20);
        assert!(!config.clients.log_connections);
    }

    #[test]
    fn test_load_partial_toml_uses_defaults() {
        let toml_str = r#"
            [queue]
            length = 4
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.queue.length, 4);
        assert_eq!(config.queue.workers, 2);
        assert_eq!(config.segment.sample_rate, 12000);
    }

    #[test]
    fn test_load_full_toml() {
        let toml_str = r#"
            [segment]
            temporary_directory = "/var/lib/sigchop"
            sample_rate = 12000
            chunk_bytes = 512

            [queue]
            length = 20
            workers = 4

            [decoder]
            timeout_secs = 5

            [clients]
            max_clients = 50
            log_connections = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.segment.temporary_directory,
            PathBuf::from("/var/lib/sigchop")
        );
        assert_eq!(config.segment.chunk_bytes, 512);
        assert_eq!(config.queue.length, 20);
        assert_eq!(config.queue.workers, 4);
        assert_eq!(config.decoder.timeout_secs, 5);
        assert_eq!(config.clients.max_clients, 50);
        assert!(config.clients.log_connections);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[queue]\nworkers = 3").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.queue.workers, 3);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/sigchop.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/sigchop.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_queue_length() {
        let mut config = Config::default();
        config.queue.length = 0;
        let result = config.validate();
        match result {
            Err(SigchopError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "queue.length");
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.queue.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_bytes() {
        let mut config = Config::default();
        config.segment.chunk_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: test-only env mutation; keys are unique to this test.
        unsafe {
            std::env::set_var("SIGCHOP_TMP_DIR", "/dev/shm/sigchop");
            std::env::set_var("SIGCHOP_QUEUE_LENGTH", "42");
        }

        let config = Config::default().with_env_overrides();
        assert_eq!(
            config.segment.temporary_directory,
            PathBuf::from("/dev/shm/sigchop")
        );
        assert_eq!(config.queue.length, 42);

        unsafe {
            std::env::remove_var("SIGCHOP_TMP_DIR");
            std::env::remove_var("SIGCHOP_QUEUE_LENGTH");
        }
    }

    #[test]
    fn test_env_override_ignores_unparsable_numbers() {
        unsafe {
            std::env::set_var("SIGCHOP_QUEUE_WORKERS", "not-a-number");
        }
        let config = Config::default().with_env_overrides();
        assert_eq!(config.queue.workers, defaults::QUEUE_WORKERS);
        unsafe {
            std::env::remove_var("SIGCHOP_QUEUE_WORKERS");
        }
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        assert!(path.ends_with("sigchop/config.toml"));
    }
}
