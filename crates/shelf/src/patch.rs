use libris_catalog::Book;

/// Sparse metadata update for a catalogued book.
///
/// `None` leaves a field untouched. For title, author, publisher and year an
/// empty string or `0` is also treated as "no change". ISBN is the exception:
/// `Some(String::new())` explicitly clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<u32>,
    pub isbn: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl BookPatch {
    /// Whether applying the patch would leave every field as it was.
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().is_none_or(str::is_empty)
            && self.author.as_deref().is_none_or(str::is_empty)
            && self.publisher.as_deref().is_none_or(str::is_empty)
            && self.year.is_none_or(|year| year == 0)
            && self.isbn.is_none()
    }

    pub(crate) fn apply(self, book: &mut Book) {
        if let Some(title) = non_empty(self.title) {
            book.title = title;
        }
        if let Some(author) = non_empty(self.author) {
            book.author = author;
        }
        if let Some(publisher) = non_empty(self.publisher) {
            book.publisher = publisher;
        }
        if let Some(year) = self.year.filter(|year| *year != 0) {
            book.year = year;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_catalog::BookId;
    use std::path::PathBuf;
    use time::UtcDateTime;
    use uuid::Uuid;

    fn book() -> Book {
        let now = UtcDateTime::now();
        Book {
            id: BookId::from(Uuid::now_v7()),
            title: "Solaris".to_string(),
            author: "Stanisław Lem".to_string(),
            publisher: "MON".to_string(),
            year: 1961,
            created_at: now,
            updated_at: now,
            isbn: "ISBN123".to_string(),
            file_hash: "abc".to_string(),
            file_path: PathBuf::from("2024/01/01/solaris.epub"),
            cover_path: None,
            format: "epub".to_string(),
        }
    }

    #[test]
    fn test_empty_values_change_nothing() {
        let patch = BookPatch {
            title: Some(String::new()),
            author: None,
            publisher: Some(String::new()),
            year: Some(0),
            isbn: None,
        };
        assert!(patch.is_empty());
        let original = book();
        let mut patched = original.clone();
        patch.apply(&mut patched);
        assert_eq!(patched, original);
    }

    #[test]
    fn test_set_fields() {
        let mut patched = book();
        BookPatch {
            title: Some("Solaris (1970 translation)".to_string()),
            year: Some(1970),
            ..BookPatch::default()
        }
        .apply(&mut patched);
        assert_eq!(patched.title, "Solaris (1970 translation)");
        assert_eq!(patched.year, 1970);
        assert_eq!(patched.author, "Stanisław Lem");
        assert_eq!(patched.isbn, "ISBN123");
    }

    #[test]
    fn test_isbn_can_be_cleared() {
        let mut patched = book();
        let patch = BookPatch { isbn: Some(String::new()), ..BookPatch::default() };
        assert!(!patch.is_empty());
        patch.apply(&mut patched);
        assert_eq!(patched.isbn, "");

        // Clearing an already empty ISBN is a no-op.
        BookPatch { isbn: Some(String::new()), ..BookPatch::default() }.apply(&mut patched);
        assert_eq!(patched.isbn, "");
    }
}
