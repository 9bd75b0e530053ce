use crate::error::{ErrorKind, Result};
use crate::fingerprint::partial_md5;
use crate::id::{Clock, IdGenerator, SystemClock, UuidV7};
use crate::keys::{book_key, cover_key};
use crate::page::PaginatedBookList;
use crate::patch::BookPatch;
use exn::ResultExt;
use libris_catalog::error::ErrorKind as CatalogErrorKind;
use libris_catalog::{Book, BookId, CatalogRepository, Pagination, Sort};
use libris_metadata::{Extractor, FormatExtractor};
use libris_storage::{BackendHandle, BoxSyncRead};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::instrument;

/// The outcome of (successfully) submitting a book to the shelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stored {
    /// The book was new; its file is in storage and it has been catalogued.
    Created(Book),
    /// A book with the same fingerprint is already catalogued. Nothing was
    /// written; this is the existing record.
    AlreadyExists(Book),
}

impl Stored {
    pub fn book(&self) -> &Book {
        match self {
            Self::Created(book) | Self::AlreadyExists(book) => book,
        }
    }

    pub fn into_book(self) -> Book {
        match self {
            Self::Created(book) | Self::AlreadyExists(book) => book,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Ingestion and retrieval of books.
///
/// Ties together the [catalog](CatalogRepository), blob storage and metadata
/// extraction. Holds no mutable state of its own: clones share the same
/// collaborators and may be used from any number of tasks at once.
///
/// Blob writes always happen before the catalog write, so a failure part-way
/// through can leave an unreferenced blob in storage but never a catalog row
/// pointing at a missing file.
#[derive(Clone)]
pub struct BookShelf {
    storage: BackendHandle,
    catalog: Arc<dyn CatalogRepository>,
    extractor: Arc<dyn Extractor>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl BookShelf {
    /// A shelf using EPUB/FB2/PDF extraction, UUIDv7 identifiers and the
    /// system clock.
    pub fn new(storage: BackendHandle, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self {
            storage,
            catalog,
            extractor: Arc::new(FormatExtractor),
            ids: Arc::new(UuidV7),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Current time at the catalog's (one second) resolution.
    fn now(&self) -> UtcDateTime {
        let now = self.clock.now();
        now.replace_nanosecond(0).unwrap_or(now)
    }

    /// Ingest an uploaded file.
    ///
    /// 1. Fingerprint the upload and return the existing record if the
    ///    fingerprint is already catalogued.
    /// 2. Extract metadata; unrecognised formats are rejected before anything
    ///    is written.
    /// 3. Copy the file into storage under a date-partitioned key.
    /// 4. Store the cover, if there is one. Failure here is logged and the
    ///    book is catalogued without a cover.
    /// 5. Catalogue the book.
    ///
    /// `original_name` is only used as a title when the file has none.
    #[instrument(skip(self, file), fields(file = %file.as_ref().display()))]
    pub async fn store_book(&self, file: impl AsRef<Path>, original_name: &str) -> Result<Stored> {
        let file = file.as_ref();
        let file_hash = fingerprint(file).await?;

        match self.catalog.get_by_file_hash(&file_hash).await {
            Ok(existing) => {
                tracing::debug!(id = %existing.id, %file_hash, "upload matches a catalogued book");
                return Ok(Stored::AlreadyExists(existing));
            },
            Err(e) if matches!(e.deref(), CatalogErrorKind::NotFound) => {},
            Err(e) => return Err(e).or_raise(|| ErrorKind::Persistence),
        }

        let data = tokio::fs::read(file).await.or_raise(|| ErrorKind::Extract)?;
        let extractor = Arc::clone(&self.extractor);
        let metadata = tokio::task::spawn_blocking(move || extractor.extract(&data))
            .await
            .or_raise(|| ErrorKind::Extract)?
            .or_raise(|| ErrorKind::Extract)?;
        let Some(format) = metadata.format else {
            exn::bail!(ErrorKind::UnknownFormat);
        };

        let id = self.ids.generate();
        let created_at = self.now();
        let file_path = book_key(created_at, id, format);
        self.storage.put_file(file, &file_path).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(%id, %file_hash, key = %file_path.display(), "stored book file");

        let cover_path = self.store_cover(id, &metadata.cover).await;

        let title = if metadata.title.trim().is_empty() {
            title_from_file_name(original_name)
        } else {
            metadata.title
        };
        let book = Book {
            id,
            title,
            author: metadata.author,
            publisher: metadata.publisher,
            // Extraction doesn't report a publication year.
            year: 0,
            created_at,
            updated_at: created_at,
            isbn: metadata.isbn,
            file_hash,
            file_path,
            cover_path,
            format: format.to_string(),
        };
        match self.catalog.store(&book).await {
            Ok(()) => Ok(Stored::Created(book)),
            Err(e) if matches!(e.deref(), CatalogErrorKind::AlreadyExists) => self.lost_race(&book, e).await,
            Err(e) => Err(e).or_raise(|| ErrorKind::Persistence),
        }
    }

    /// The insert hit a uniqueness constraint after the dedup check passed.
    /// If a concurrent upload of the same file got there first, that's its
    /// record; otherwise the generated ID collided and the insert fails.
    /// The blob written for `book` is left behind either way.
    async fn lost_race(&self, book: &Book, conflict: libris_catalog::error::Error) -> Result<Stored> {
        match self.catalog.get_by_file_hash(&book.file_hash).await {
            Ok(existing) => {
                tracing::debug!(
                    id = %existing.id,
                    orphan = %book.file_path.display(),
                    "concurrent upload catalogued the same file first"
                );
                Ok(Stored::AlreadyExists(existing))
            },
            Err(e) if matches!(e.deref(), CatalogErrorKind::NotFound) => {
                Err(conflict).or_raise(|| ErrorKind::AlreadyExists)
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Persistence),
        }
    }

    /// Best-effort cover upload, returning the key it was stored under.
    async fn store_cover(&self, id: BookId, cover: &[u8]) -> Option<PathBuf> {
        if cover.is_empty() {
            return None;
        }
        let key = cover_key(id);
        match self.put_bytes(cover, &key).await {
            Ok(()) => Some(key),
            Err(e) => {
                tracing::warn!(%id, key = %key.display(), error = ?e, "failed to store cover; continuing without one");
                None
            },
        }
    }

    /// Stage bytes in a temporary file and hand that to storage, the same way
    /// uploads arrive.
    async fn put_bytes(&self, data: &[u8], key: &Path) -> Result<()> {
        let staged = tempfile::NamedTempFile::new().or_raise(|| ErrorKind::Storage)?;
        tokio::fs::write(staged.path(), data).await.or_raise(|| ErrorKind::Storage)?;
        self.storage.put_file(staged.path(), key).await.or_raise(|| ErrorKind::Storage)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_books(&self, sort: Sort, pagination: Pagination) -> Result<PaginatedBookList> {
        let books = self.catalog.list(sort, pagination).await.or_raise(|| ErrorKind::Persistence)?;
        let total = self.catalog.count().await.or_raise(|| ErrorKind::Persistence)?;
        Ok(PaginatedBookList::new(books, pagination, total))
    }

    /// Case-insensitive substring search over title, author, publisher and
    /// ISBN. An empty query lists everything.
    #[instrument(skip(self))]
    pub async fn search_books(&self, query: &str, sort: Sort, pagination: Pagination) -> Result<PaginatedBookList> {
        let books = self.catalog.search(query, sort, pagination).await.or_raise(|| ErrorKind::Persistence)?;
        let total = self.catalog.count_search(query).await.or_raise(|| ErrorKind::Persistence)?;
        Ok(PaginatedBookList::new(books, pagination, total))
    }

    pub async fn view_book(&self, id: BookId) -> Result<Book> {
        match self.catalog.get_by_id(id).await {
            Ok(book) => Ok(book),
            Err(e) if matches!(e.deref(), CatalogErrorKind::NotFound) => Err(e).or_raise(|| ErrorKind::NotFound),
            Err(e) => Err(e).or_raise(|| ErrorKind::Persistence),
        }
    }

    /// Apply a sparse patch to a book's metadata. `updated_at` is refreshed
    /// even when the patch changes nothing else.
    #[instrument(skip(self))]
    pub async fn update_book_metadata(&self, id: BookId, patch: BookPatch) -> Result<Book> {
        let mut book = self.view_book(id).await?;
        if patch.is_empty() {
            tracing::debug!(%id, "empty patch; only refreshing updated_at");
        }
        patch.apply(&mut book);
        book.updated_at = self.now();
        match self.catalog.update(&book).await {
            Ok(()) => Ok(book),
            Err(e) if matches!(e.deref(), CatalogErrorKind::NoRowsAffected) => {
                Err(e).or_raise(|| ErrorKind::UpdateNoRowsAffected)
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Persistence),
        }
    }

    /// The book's record and a reader over its stored file.
    pub async fn download_book(&self, id: BookId) -> Result<(Book, BoxSyncRead)> {
        let book = self.view_book(id).await?;
        let reader = self.storage.reader(&book.file_path).await.or_raise(|| ErrorKind::Storage)?;
        Ok((book, reader))
    }

    /// A reader over the book's cover image. Books without a cover fail with
    /// [`ErrorKind::NoCover`] without touching storage.
    pub async fn view_cover(&self, id: BookId) -> Result<BoxSyncRead> {
        let book = self.view_book(id).await?;
        let Some(cover_path) = book.cover_path.as_deref().filter(|_| book.has_cover()) else {
            exn::bail!(ErrorKind::NoCover);
        };
        self.storage.reader(cover_path).await.or_raise(|| ErrorKind::Storage)
    }
}

async fn fingerprint(file: &Path) -> Result<String> {
    let file = file.to_path_buf();
    tokio::task::spawn_blocking(move || partial_md5(&mut std::fs::File::open(file)?))
        .await
        .or_raise(|| ErrorKind::Fingerprint)?
        .or_raise(|| ErrorKind::Fingerprint)
}

/// `"Some Book.epub"` → `"Some Book"`.
fn title_from_file_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_catalog::error::Result as CatalogResult;
    use libris_catalog::{Database, Repository, SortBy, SortOrder};
    use libris_metadata::error::{ErrorKind as MetadataErrorKind, Result as MetadataResult};
    use libris_metadata::{BookMetadata, Format};
    use libris_storage::StorageBackend;
    use libris_storage::backend::MockBackend;
    use std::io::{Read, Write};
    use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
    use time::macros::datetime;
    use uuid::Uuid;

    /// Returns whatever metadata it was built with, for any input.
    struct StubExtractor(BookMetadata);
    impl Extractor for StubExtractor {
        fn extract(&self, _data: &[u8]) -> MetadataResult<BookMetadata> {
            Ok(self.0.clone())
        }
    }

    struct BrokenExtractor;
    impl Extractor for BrokenExtractor {
        fn extract(&self, _data: &[u8]) -> MetadataResult<BookMetadata> {
            exn::bail!(MetadataErrorKind::Archive)
        }
    }

    /// Sequential IDs; `repeat` hands out the same ID forever.
    #[derive(Default)]
    struct SequentialIds {
        next: AtomicU64,
        repeat: bool,
    }
    impl IdGenerator for SequentialIds {
        fn generate(&self) -> BookId {
            let n = if self.repeat { 1 } else { self.next.fetch_add(1, Ordering::SeqCst) + 1 };
            BookId::from(Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0000 + u128::from(n)))
        }
    }

    fn id(n: u64) -> BookId {
        BookId::from(Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0000 + u128::from(n)))
    }

    /// Starts at 2024-05-17T10:00:00.5Z and ticks one minute per call.
    struct TickingClock(AtomicI64);
    impl Default for TickingClock {
        fn default() -> Self {
            Self(AtomicI64::new(0))
        }
    }
    impl Clock for TickingClock {
        fn now(&self) -> UtcDateTime {
            let minutes = self.0.fetch_add(1, Ordering::SeqCst);
            datetime!(2024-05-17 10:00:00.5 UTC).to_utc() + time::Duration::minutes(minutes)
        }
    }

    fn metadata(title: &str, cover: &[u8]) -> BookMetadata {
        BookMetadata {
            title: title.to_string(),
            author: "Ursula K. Le Guin".to_string(),
            publisher: "Ace".to_string(),
            isbn: "9780441478125".to_string(),
            cover: cover.to_vec(),
            format: Some(Format::Epub),
        }
    }

    struct Fixture {
        shelf: BookShelf,
        backend: Arc<MockBackend>,
        catalog: Arc<Repository>,
    }

    async fn fixture_with(backend: MockBackend, extractor: impl Extractor + 'static, ids: SequentialIds) -> Fixture {
        let db = Database::connect_in_memory().await.unwrap();
        let catalog = Arc::new(Repository::from(&db));
        let backend = Arc::new(backend);
        let shelf = BookShelf::new(backend.clone(), catalog.clone())
            .with_extractor(extractor)
            .with_id_generator(ids)
            .with_clock(TickingClock::default());
        Fixture { shelf, backend, catalog }
    }

    async fn fixture(extracted: BookMetadata) -> Fixture {
        fixture_with(MockBackend::default(), StubExtractor(extracted), SequentialIds::default()).await
    }

    fn upload(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn read_all(mut reader: BoxSyncRead) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_store_book() {
        let f = fixture(metadata("The Dispossessed", b"\xff\xd8\xffcover")).await;
        let file = upload(b"PK book one");
        let stored = f.shelf.store_book(file.path(), "dispossessed.epub").await.unwrap();
        assert!(stored.is_created());
        let book = stored.into_book();

        assert_eq!(book.id, id(1));
        assert_eq!(book.title, "The Dispossessed");
        assert_eq!(book.year, 0);
        assert_eq!(book.format, "epub");
        assert_eq!(book.file_hash.len(), 32);
        assert_eq!(book.file_path, PathBuf::from(format!("2024/05/17/{}.epub", id(1))));
        assert_eq!(book.cover_path, Some(PathBuf::from(format!("covers/{}.jpg", id(1)))));
        assert_eq!(book.created_at, datetime!(2024-05-17 10:00:00 UTC).to_utc());
        assert_eq!(book.created_at, book.updated_at);

        assert_eq!(f.backend.keys().await, vec![book.file_path.clone(), book.cover_path.clone().unwrap()]);
        assert_eq!(f.backend.read(&book.file_path).await.unwrap(), b"PK book one");
        assert_eq!(f.catalog.get_by_id(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_fingerprint_is_koreader_partial_md5() {
        let f = fixture(metadata("Hello", b"")).await;
        let book = f.shelf.store_book(upload(b"hello").path(), "hello.epub").await.unwrap().into_book();
        assert_eq!(book.file_hash, "5d41402abc4b2a76b9719d911017c592");
    }

    #[tokio::test]
    async fn test_duplicate_upload_returns_existing_book() {
        let f = fixture(metadata("The Lathe of Heaven", b"jpg")).await;
        let first = f.shelf.store_book(upload(b"same bytes").path(), "a.epub").await.unwrap();
        let second = f.shelf.store_book(upload(b"same bytes").path(), "b.epub").await.unwrap();

        assert!(matches!(second, Stored::AlreadyExists(_)));
        assert_eq!(second.book(), first.book());
        assert_eq!(f.catalog.count().await.unwrap(), 1);
        // Nothing new was written for the duplicate.
        assert_eq!(f.backend.keys().await.len(), 2);

        let page = f.shelf.list_books(Sort::default(), Pagination::new(1, 25)).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.books.len(), 1);
        assert_eq!(page.books[0].id, first.book().id);
    }

    #[tokio::test]
    async fn test_unknown_format_writes_nothing() {
        let f = fixture(BookMetadata { format: None, ..metadata("Mystery", b"jpg") }).await;
        let err = f.shelf.store_book(upload(b"plain text").path(), "notes.txt").await.unwrap_err();
        assert_eq!(*err, ErrorKind::UnknownFormat);
        assert!(f.backend.keys().await.is_empty());
        assert_eq!(f.catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure() {
        let f = fixture_with(MockBackend::default(), BrokenExtractor, SequentialIds::default()).await;
        let err = f.shelf.store_book(upload(b"PK broken").path(), "broken.epub").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Extract);
        assert!(f.backend.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_upload_cannot_be_fingerprinted() {
        let f = fixture(metadata("Gone", b"")).await;
        let dir = tempfile::tempdir().unwrap();
        let err = f.shelf.store_book(dir.path().join("missing.epub"), "missing.epub").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Fingerprint);
    }

    #[tokio::test]
    async fn test_primary_write_failure_is_fatal() {
        let backend = MockBackend::default().failing_writes_under("2024");
        let f = fixture_with(backend, StubExtractor(metadata("Rocannon's World", b"jpg")), SequentialIds::default()).await;
        let err = f.shelf.store_book(upload(b"PK").path(), "rocannon.epub").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Storage);
        assert!(f.backend.keys().await.is_empty());
        assert_eq!(f.catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cover_write_failure_is_swallowed() {
        let backend = MockBackend::default().failing_writes_under("covers");
        let f = fixture_with(backend, StubExtractor(metadata("Planet of Exile", b"jpg")), SequentialIds::default()).await;
        let book = f.shelf.store_book(upload(b"PK").path(), "exile.epub").await.unwrap().into_book();
        assert_eq!(book.cover_path, None);
        assert_eq!(f.backend.keys().await, vec![book.file_path.clone()]);
        assert_eq!(f.catalog.get_by_id(book.id).await.unwrap().cover_path, None);
    }

    #[tokio::test]
    async fn test_catalog_failure_orphans_blob() {
        // Two different files given the same ID: the second insert hits the
        // primary key after its blob has already been written.
        let ids = SequentialIds { repeat: true, ..SequentialIds::default() };
        let f = fixture_with(MockBackend::default(), StubExtractor(metadata("Twin", b"")), ids).await;
        f.shelf.store_book(upload(b"first").path(), "first.epub").await.unwrap();
        let err = f.shelf.store_book(upload(b"second").path(), "second.epub").await.unwrap_err();
        assert_eq!(*err, ErrorKind::AlreadyExists);
        assert_eq!(f.catalog.count().await.unwrap(), 1);
        // Both blobs landed on the same (dated) key; the catalog only knows one book.
        assert_eq!(f.backend.keys().await.len(), 1);
    }

    /// Misses the first `misses` fingerprint lookups, as if another upload
    /// of the same file committed right after each dedup check.
    struct LateDedup {
        inner: Repository,
        misses: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogRepository for LateDedup {
        async fn store(&self, book: &Book) -> CatalogResult<()> {
            self.inner.store(book).await
        }
        async fn update(&self, book: &Book) -> CatalogResult<()> {
            self.inner.update(book).await
        }
        async fn list(&self, sort: Sort, pagination: Pagination) -> CatalogResult<Vec<Book>> {
            self.inner.list(sort, pagination).await
        }
        async fn search(&self, query: &str, sort: Sort, pagination: Pagination) -> CatalogResult<Vec<Book>> {
            self.inner.search(query, sort, pagination).await
        }
        async fn count(&self) -> CatalogResult<u64> {
            self.inner.count().await
        }
        async fn count_search(&self, query: &str) -> CatalogResult<u64> {
            self.inner.count_search(query).await
        }
        async fn get_by_id(&self, id: BookId) -> CatalogResult<Book> {
            self.inner.get_by_id(id).await
        }
        async fn get_by_file_hash(&self, file_hash: &str) -> CatalogResult<Book> {
            let missed = self.misses.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if missed.is_ok() {
                exn::bail!(CatalogErrorKind::NotFound);
            }
            self.inner.get_by_file_hash(file_hash).await
        }
    }

    #[tokio::test]
    async fn test_losing_upload_race_returns_existing_book() {
        let db = Database::connect_in_memory().await.unwrap();
        let catalog = Arc::new(LateDedup { inner: Repository::from(&db), misses: AtomicUsize::new(2) });
        let backend = Arc::new(MockBackend::default());
        let shelf = BookShelf::new(backend.clone(), catalog.clone())
            .with_extractor(StubExtractor(metadata("The Beginning Place", b"")))
            .with_id_generator(SequentialIds::default())
            .with_clock(TickingClock::default());

        let first = shelf.store_book(upload(b"same bytes").path(), "a.epub").await.unwrap();
        let second = shelf.store_book(upload(b"same bytes").path(), "b.epub").await.unwrap();

        assert!(first.is_created());
        assert_eq!(second, Stored::AlreadyExists(first.book().clone()));
        assert_eq!(catalog.count().await.unwrap(), 1);
        // The loser's blob was written before the insert failed.
        assert_eq!(backend.keys().await.len(), 2);
    }

    #[tokio::test]
    async fn test_title_falls_back_to_file_name() {
        let f = fixture(metadata("   ", b"")).await;
        let book = f.shelf.store_book(upload(b"PK").path(), "uploads/Left Hand of Darkness.epub").await.unwrap();
        assert_eq!(book.book().title, "Left Hand of Darkness");
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let f = fixture(metadata("A Wizard of Earthsea", b"")).await;
        for n in 0..3u8 {
            f.shelf.store_book(upload(&[n; 8]).path(), "x.epub").await.unwrap();
        }
        let sort = Sort { by: SortBy::CreatedAt, order: SortOrder::Asc };

        let page = f.shelf.list_books(sort, Pagination::new(0, 2)).await.unwrap();
        assert_eq!((page.page, page.per_page, page.total_count), (1, 2, 3));
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.books.iter().map(|b| b.id).collect::<Vec<_>>(), [id(1), id(2)]);

        let found = f.shelf.search_books("earthsea", sort, Pagination::new(2, 2)).await.unwrap();
        assert_eq!(found.total_count, 3);
        assert_eq!(found.books.iter().map(|b| b.id).collect::<Vec<_>>(), [id(3)]);

        let everything = f.shelf.search_books("", sort, Pagination::new(1, 0)).await.unwrap();
        let listed = f.shelf.list_books(sort, Pagination::new(1, 0)).await.unwrap();
        assert_eq!(everything, listed);

        let none = f.shelf.search_books("tolkien", sort, Pagination::default()).await.unwrap();
        assert_eq!((none.total_count, none.total_pages()), (0, 0));
        assert!(none.books.is_empty());
    }

    #[tokio::test]
    async fn test_view_book_not_found() {
        let f = fixture(metadata("Unused", b"")).await;
        let err = f.shelf.view_book(id(99)).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_with_empty_patch_only_touches_updated_at() {
        let f = fixture(metadata("The Word for World Is Forest", b"")).await;
        let original = f.shelf.store_book(upload(b"PK").path(), "w.epub").await.unwrap().into_book();
        let patch = BookPatch {
            title: Some(String::new()),
            author: Some(String::new()),
            publisher: None,
            year: Some(0),
            isbn: None,
        };
        let updated = f.shelf.update_book_metadata(original.id, patch).await.unwrap();

        assert!(updated.updated_at > original.updated_at);
        assert_eq!(Book { updated_at: original.updated_at, ..updated.clone() }, original);
        assert_eq!(f.shelf.view_book(original.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_sets_and_clears_fields() {
        let f = fixture(BookMetadata { isbn: "ISBN123".to_string(), ..metadata("Always Coming Home", b"") }).await;
        let original = f.shelf.store_book(upload(b"PK").path(), "home.epub").await.unwrap().into_book();
        let patch = BookPatch {
            publisher: Some("Harper & Row".to_string()),
            year: Some(1985),
            isbn: Some(String::new()),
            ..BookPatch::default()
        };
        let updated = f.shelf.update_book_metadata(original.id, patch).await.unwrap();
        assert_eq!(updated.publisher, "Harper & Row");
        assert_eq!(updated.year, 1985);
        assert_eq!(updated.isbn, "");
        assert_eq!(updated.title, original.title);
        assert_eq!(updated.file_path, original.file_path);
        assert_eq!(f.shelf.view_book(original.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_unknown_book() {
        let f = fixture(metadata("Unused", b"")).await;
        let err = f.shelf.update_book_metadata(id(7), BookPatch::default()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_download_book() {
        let f = fixture(metadata("Lavinia", b"")).await;
        let stored = f.shelf.store_book(upload(b"%PDF-1.7 lavinia").path(), "lavinia.pdf").await.unwrap();
        let (book, reader) = f.shelf.download_book(stored.book().id).await.unwrap();
        assert_eq!(&book, stored.book());
        assert_eq!(read_all(reader), b"%PDF-1.7 lavinia");
    }

    #[tokio::test]
    async fn test_view_cover() {
        let f = fixture(metadata("Tehanu", b"\xff\xd8\xff")).await;
        let stored = f.shelf.store_book(upload(b"PK").path(), "tehanu.epub").await.unwrap();
        let cover = f.shelf.view_cover(stored.book().id).await.unwrap();
        assert_eq!(read_all(cover), b"\xff\xd8\xff");
    }

    #[tokio::test]
    async fn test_view_cover_without_cover_never_reads_storage() {
        let f = fixture(metadata("The Telling", b"")).await;
        let stored = f.shelf.store_book(upload(b"PK").path(), "telling.epub").await.unwrap();
        let reads = f.backend.reads();
        let Err(err) = f.shelf.view_cover(stored.book().id).await else {
            panic!("expected a missing cover");
        };
        assert_eq!(*err, ErrorKind::NoCover);
        assert_eq!(f.backend.reads(), reads);
    }

    #[tokio::test]
    async fn test_closed_catalog_is_a_persistence_failure() {
        let db = Database::connect_in_memory().await.unwrap();
        let shelf = BookShelf::new(Arc::new(MockBackend::default()), Arc::new(Repository::from(&db)))
            .with_extractor(StubExtractor(metadata("Unused", b"")));
        db.close().await;
        let err = shelf.store_book(upload(b"PK").path(), "x.epub").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Persistence);
        let err = shelf.list_books(Sort::default(), Pagination::default()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Persistence);
    }

    #[rstest::rstest]
    #[case("Book.epub", "Book")]
    #[case("/tmp/uploads/My Book.v2.fb2", "My Book.v2")]
    #[case("", "")]
    fn test_title_from_file_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(title_from_file_name(name), expected);
    }
}
