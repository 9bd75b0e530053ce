use crate::Format;

/// Bibliographic fields pulled out of an uploaded book.
///
/// Missing fields are empty strings rather than `None`; the catalog stores
/// them the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    /// Authors joined with `", "`
    pub author: String,
    pub publisher: String,
    /// Bare ISBN-10/13 when one could be identified
    pub isbn: String,
    /// Raw cover image bytes (empty when the book has no cover)
    pub cover: Vec<u8>,
    /// `None` when the file isn't a format we understand
    pub format: Option<Format>,
}
