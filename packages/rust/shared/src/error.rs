//! Error types for logosync.
//!
//! Library crates use [`LogoSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all logosync operations.
#[derive(Debug, thiserror::Error)]
pub enum LogoSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page, manifest, or asset.
    #[error("network error: {0}")]
    Network(String),

    /// HTML, JSON, or CSV parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The content store answered with a non-success status.
    #[error("store error (status {status}): {message}")]
    Store { status: u16, message: String },

    /// The requested remote entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Space-token exchange with the content store failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Signed asset upload failed at any stage.
    #[error("upload error: {0}")]
    Upload(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, empty slug, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The batch was cancelled before every item was dispatched.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LogoSyncError>;

impl LogoSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the remote entry simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
