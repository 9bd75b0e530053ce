//! Storage keys for book files and covers.

use libris_catalog::BookId;
use libris_metadata::Format;
use std::path::PathBuf;
use time::UtcDateTime;

const COVER_PREFIX: &str = "covers";

/// `YYYY/MM/DD/<id>.<ext>`, partitioned by the (UTC) ingestion date.
pub(crate) fn book_key(ingested_at: UtcDateTime, id: BookId, format: Format) -> PathBuf {
    let date = ingested_at.date();
    PathBuf::from(format!(
        "{:04}/{:02}/{:02}/{id}.{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        format.extension(),
    ))
}

/// `covers/<id>.jpg`, regardless of the image's actual encoding.
pub(crate) fn cover_key(id: BookId) -> PathBuf {
    PathBuf::from(format!("{COVER_PREFIX}/{id}.jpg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    const ID: &str = "01900000-0000-7000-8000-000000000001";

    #[test]
    fn test_book_key() {
        let id: BookId = ID.parse().unwrap();
        let at = datetime!(2024-03-07 23:59:59 UTC).to_utc();
        assert_eq!(book_key(at, id, Format::Epub), PathBuf::from(format!("2024/03/07/{ID}.epub")));
        assert_eq!(book_key(at, id, Format::Fb2), PathBuf::from(format!("2024/03/07/{ID}.fb2")));
    }

    #[test]
    fn test_cover_key() {
        let id = BookId::from(Uuid::parse_str(ID).unwrap());
        assert_eq!(cover_key(id), PathBuf::from(format!("covers/{ID}.jpg")));
    }

    #[test]
    fn test_keys_are_valid_storage_paths() {
        let id: BookId = ID.parse().unwrap();
        let at = datetime!(1999-12-31 00:00 UTC).to_utc();
        for key in [book_key(at, id, Format::Pdf), cover_key(id)] {
            assert_eq!(libris_storage::validate_path(&key).unwrap(), key);
        }
    }
}
