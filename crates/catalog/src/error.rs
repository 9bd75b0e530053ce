//! Catalog Error Types
//!
//! Structured errors using `exn` for automatic location tracking. The
//! underlying `sqlx` error is kept as a child of the raised kind, so callers
//! match on the kind and logs still carry the driver's message.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// A uniqueness constraint (book ID or file hash) rejected the insert.
    #[display("book already exists")]
    AlreadyExists,
    /// A point lookup matched no rows.
    #[display("book not found")]
    NotFound,
    /// An update targeted an ID that isn't in the catalog.
    #[display("no rows affected")]
    NoRowsAffected,
    /// A stored value could not be converted to or from its column.
    #[display("invalid catalog data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // SQLITE_BUSY past the busy timeout surfaces as a plain database error.
        matches!(self, Self::Database)
    }
}
