use derive_more::{Display, From, Into};
use std::path::PathBuf;
use std::str::FromStr;
use time::UtcDateTime;
use uuid::Uuid;

/// Time-ordered, immutable book identifier.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
pub struct BookId(Uuid);

impl BookId {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A catalogued book.
///
/// `id`, `file_hash`, `file_path` and `created_at` are fixed when the book is
/// ingested; only the bibliographic fields and `updated_at` ever change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publisher: String,
    /// Publication year, `0` when unknown.
    pub year: u32,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
    pub isbn: String,
    /// Partial content fingerprint used for deduplication.
    pub file_hash: String,
    /// Storage key of the book file.
    pub file_path: PathBuf,
    /// Storage key of the cover image, if one was stored.
    pub cover_path: Option<PathBuf>,
    /// File format extension (`epub`, `fb2`, `pdf`).
    pub format: String,
}

impl Book {
    pub fn has_cover(&self) -> bool {
        self.cover_path.as_ref().is_some_and(|path| !path.as_os_str().is_empty())
    }
}
