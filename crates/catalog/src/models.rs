use crate::book::{Book, BookId};
use crate::error::{Error, ErrorKind};
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

fn path_column(path: &Path, field: &'static str) -> Result<String, Error> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData(field))?.to_string())
}

/// Value of the `search_text` column.
///
/// Fields are joined with a unit separator so a query can't match across
/// the boundary between, say, the title and the author.
pub(crate) fn search_text(book: &Book) -> String {
    [&book.title, &book.author, &book.publisher, &book.isbn]
        .map(|field| field.to_lowercase())
        .join("\u{1f}")
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) publisher: String,
    pub(crate) year: i64,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
    pub(crate) isbn: String,
    pub(crate) file_hash: String,
    pub(crate) file_path: String,
    pub(crate) cover_path: Option<String>,
    pub(crate) format: String,
}

impl TryFrom<&Book> for BookRow {
    type Error = Error;
    fn try_from(book: &Book) -> Result<Self, Self::Error> {
        if book.file_path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::InvalidData("file path"));
        }
        Ok(Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            publisher: book.publisher.clone(),
            year: i64::from(book.year),
            created_at: book.created_at.unix_timestamp(),
            updated_at: book.updated_at.unix_timestamp(),
            isbn: book.isbn.clone(),
            file_hash: book.file_hash.clone(),
            file_path: path_column(&book.file_path, "file path")?,
            cover_path: book
                .cover_path
                .as_deref()
                .filter(|path| !path.as_os_str().is_empty())
                .map(|path| path_column(path, "cover path"))
                .transpose()?,
            format: book.format.clone(),
        })
    }
}

impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.parse::<BookId>().or_raise(|| ErrorKind::InvalidData("book id"))?,
            title: row.title,
            author: row.author,
            publisher: row.publisher,
            year: u32::try_from(row.year).or_raise(|| ErrorKind::InvalidData("year"))?,
            created_at: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("creation date"))?,
            updated_at: UtcDateTime::from_unix_timestamp(row.updated_at)
                .or_raise(|| ErrorKind::InvalidData("update date"))?,
            isbn: row.isbn,
            file_hash: row.file_hash,
            file_path: PathBuf::from(row.file_path),
            cover_path: row.cover_path.filter(|path| !path.is_empty()).map(PathBuf::from),
            format: row.format,
        })
    }
}
