//! Error types for convsync-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the convsync-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error tied to a specific file
    #[error("failed to access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No transcript could be located for a session
    #[error("transcript not found for session: {0}")]
    TranscriptNotFound(String),

    /// Invalid transcript discovery pattern
    #[error("invalid transcript search pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Wrap an IO error with the path that caused it.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for convsync-core
pub type Result<T> = std::result::Result<T, Error>;
