//! Storage Error Types
//!
//! Every variant that concerns a particular blob carries its key, so a
//! failed cover or book write can be reported without extra context.

use derive_more::{Display, Error, From};
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, From)]
pub enum ErrorKind {
    /// No blob is stored under this key.
    #[from(ignore)]
    #[display("no blob stored at {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[from(ignore)]
    #[display("access to {} denied", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("storage I/O failed: {_0}")]
    Io(std::io::Error),
    /// The key is absolute, empty or climbs out of the storage root.
    #[from(ignore)]
    #[display("invalid storage key: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Failure reported by the backend itself rather than the OS.
    #[from(ignore)]
    #[display("{_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Transient failures a caller may retry; a missing or invalid key never
    /// resolves on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }
}
