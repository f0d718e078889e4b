//! Error types for koai.
//!
//! Lower layers return these typed errors; only the command handlers and
//! the panel session turn them into user-visible text. One-shot handlers
//! print to stderr and still exit 0 so pipelines keep flowing.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid configuration, detected before any work begins.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The completion API call failed (transport, auth, or rate limit).
    /// Recoverable: the session shows the message and keeps running.
    #[error("Completion error: {0}")]
    Completion(String),

    /// An external binary could not be spawned or exited abnormally.
    #[error("Subprocess error: {0}")]
    Subprocess(String),

    /// An HTTP transport failure outside the completion API.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// File read/write failure, always naming the offending path.
    #[error("File error at {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
