//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// An unrecognised file is not an error: extraction succeeds with no format
/// and the caller decides what to do with it.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The ZIP container of an EPUB could not be read.
    #[display("corrupt EPUB container")]
    Archive,
    /// An XML document (OPF, container manifest, FB2) is malformed.
    #[display("malformed XML in {_0}")]
    Xml(#[error(not(source))] &'static str),
    /// The PDF could not be parsed.
    #[display("unreadable PDF document")]
    Pdf,
    /// A structurally required part of the document is absent.
    #[display("missing required part: {_0}")]
    MissingPart(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The file is either readable or it isn't.
        false
    }
}
