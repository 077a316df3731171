//! Error types for the archiver.
//!
//! Only failures that stop work on a whole post or day surface as errors;
//! per-unit media problems are warnings carried by the attachment scope.

use miette::Diagnostic;
use std::path::PathBuf;

/// Main error type for archive operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ArchiveError {
    /// HTTP transport error talking to the API
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// API responded outside the 2xx range
    #[error("api returned status {status} for {url}")]
    #[diagnostic(code(tumbleweed::api))]
    Api { status: u16, url: String },

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Document write failure. Fatal for that one post or day only; the
    /// caller keeps going with the rest of the queue.
    #[error("failed to write {}", path.display())]
    #[diagnostic(code(tumbleweed::write))]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration problem
    #[error("configuration error: {0}")]
    #[diagnostic(code(tumbleweed::config))]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
