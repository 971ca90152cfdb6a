//! Error types for sigchop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigchopError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio source errors
    #[error("Audio source read failed: {message}")]
    AudioSource { message: String },

    // Segment file errors
    #[error("Audio container error: {0}")]
    Wav(#[from] hound::Error),

    // Decoder errors
    #[error("Decoder failed: {message}")]
    Decode { message: String },

    // Client admission errors
    #[error("Too many clients connected (limit {max})")]
    TooManyClients { max: usize },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SigchopError>;
