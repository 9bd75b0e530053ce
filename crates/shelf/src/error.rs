//! Shelf Error Types
//!
//! Structured errors using `exn`. Failures from the catalog, storage and
//! extraction crates are attached as children of the kind raised here, so the
//! error tree records which shelf operation hit them.

use derive_more::{Display, Error};

/// A shelf error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for shelf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Domain Errors
/// - [`ErrorKind::AlreadyExists`]
/// - [`ErrorKind::UnknownFormat`]
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::NoCover`]
/// - [`ErrorKind::UpdateNoRowsAffected`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Persistence`]
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Extract`]
/// - [`ErrorKind::Fingerprint`]
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The insert collided with an existing row that isn't the same file,
    /// i.e. the generated ID is already taken.
    #[display("book already exists")]
    AlreadyExists,
    /// The upload isn't a book format we can read.
    #[display("unknown book format")]
    UnknownFormat,
    #[display("book not found")]
    NotFound,
    /// The book has no stored cover image.
    #[display("book has no cover")]
    NoCover,
    /// The book disappeared between lookup and update.
    #[display("update affected no rows")]
    UpdateNoRowsAffected,
    /// A catalog operation failed.
    #[display("catalog failure")]
    Persistence,
    /// A blob storage operation failed.
    #[display("storage failure")]
    Storage,
    /// The upload could not be read or parsed for metadata.
    #[display("metadata extraction failed")]
    Extract,
    /// The upload could not be read to compute its fingerprint.
    #[display("could not fingerprint upload")]
    Fingerprint,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence | Self::Storage)
    }
}
