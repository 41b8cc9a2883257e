//! Driver error types.
//!
//! Every failing filesystem operation surfaces as a [`FileSystemError`]. The
//! variants are a small taxonomy over `std::io::ErrorKind`; each carries the
//! operation context (what was attempted, on which path) together with the
//! OS-level error text captured from the exact call that failed. There is no
//! ambient last-error state anywhere in this crate.

use std::io;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, FileSystemError>;

/// Filesystem operation errors.
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("is a directory: {0}")]
    IsDirectory(String),
    #[error("not a directory: {0}")]
    NotDirectory(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("malformed CSV row: {0}")]
    MalformedCsv(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl FileSystemError {
    /// Build an error from an `io::Error`, classifying it by kind and
    /// folding the operation context plus the OS error text into the message.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        let context = context.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(format!("{context}: {source}")),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(format!("{context}: {source}")),
            io::ErrorKind::PermissionDenied => {
                Self::PermissionDenied(format!("{context}: {source}"))
            }
            io::ErrorKind::IsADirectory => Self::IsDirectory(format!("{context}: {source}")),
            io::ErrorKind::NotADirectory => Self::NotDirectory(format!("{context}: {source}")),
            _ => Self::Io { context, source },
        }
    }

    /// True if the error means the target path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
