//! Error types for clipq-player
//!
//! None of these are fatal to the orchestration task: every failure path
//! leaves the player Idle with the render session released.

use thiserror::Error;

/// Main error type for clipq-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Render session could not be created or navigated (item is skipped)
    #[error("Render session acquisition failed: {0}")]
    Acquisition(String),

    /// Frame capture or pattern matching failed (monitor fails open)
    #[error("Playback monitor error: {0}")]
    Monitor(String),

    /// Upstream clip API errors
    #[error("Upstream API error: {0}")]
    Upstream(String),

    /// Image decoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<clipq_common::Error> for Error {
    fn from(err: clipq_common::Error) -> Self {
        match err {
            clipq_common::Error::Config(msg) => Error::Config(msg),
            clipq_common::Error::Io(e) => Error::Io(e),
            other => Error::Internal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Upstream(err.to_string())
    }
}

/// Convenience Result type using clipq-player Error
pub type Result<T> = std::result::Result<T, Error>;
