//! Error types for the joinbench library.

use std::path::PathBuf;
use thiserror::Error;

/// Handling policy class of an error.
///
/// Retry decisions are made on this tag, never on the error's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The inference service kept reporting quota exhaustion.
    QuotaExhausted,
    /// The inference service or network kept failing transiently.
    Transient,
    /// The inference service answered, but not with the expected JSON.
    MalformedResponse,
    /// The request was refused (bad credentials, invalid request, ...).
    NonRetryable,
    /// A required external data source does not exist.
    MissingSource,
    /// Local I/O, storage, serialization or configuration failure.
    Local,
}

/// Main error type for joinbench operations.
#[derive(Debug, Error)]
pub enum JoinBenchError {
    /// Quota exhausted after the retry budget was spent.
    #[error("inference quota exhausted after {attempts} attempts: {message}")]
    QuotaExhausted { attempts: u32, message: String },

    /// Transient failures persisted after the retry budget was spent.
    #[error("inference transient failure after {attempts} attempts: {message}")]
    Transient { attempts: u32, message: String },

    /// Response text was empty or did not contain the required JSON.
    #[error("malformed inference response: {0}")]
    MalformedResponse(String),

    /// Request rejected by the inference service.
    #[error("inference request rejected: {0}")]
    NonRetryable(String),

    /// Database file (or other source) is absent.
    #[error("data source not found: {}", .0.display())]
    MissingSource(PathBuf),

    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from SQLite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl JoinBenchError {
    /// Classify this error for retry handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QuotaExhausted { .. } => ErrorKind::QuotaExhausted,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::NonRetryable(_) => ErrorKind::NonRetryable,
            Self::MissingSource(_) => ErrorKind::MissingSource,
            Self::Io { .. } | Self::Sqlite(_) | Self::Json(_) | Self::Config(_) => {
                ErrorKind::Local
            }
        }
    }
}

/// Result type alias for joinbench operations.
pub type Result<T> = std::result::Result<T, JoinBenchError>;
