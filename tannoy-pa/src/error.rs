//! Error types for tannoy-pa
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the playback agent
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Command bus errors
    #[error("Bus error: {0}")]
    Bus(#[from] rumqttc::ClientError),

    /// Speech synthesis service errors
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Synthesis request transport errors
    #[error("Synthesis request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Playback process errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the tannoy-pa Error
pub type Result<T> = std::result::Result<T, Error>;
