//! The catalog repository contract and its SQLite implementation.

use crate::Database;
use crate::book::{Book, BookId};
use crate::error::{ErrorKind, Result};
use crate::models::{BookRow, search_text};
use crate::query::{Pagination, Sort, contains_pattern};
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use tracing::instrument;

/// CRUD and paginated listing over catalogued books.
///
/// Dropping a returned future cancels the in-flight call.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert a new book.
    ///
    /// Fails with [`ErrorKind::AlreadyExists`] when the ID or file hash is
    /// already catalogued.
    async fn store(&self, book: &Book) -> Result<()>;

    /// Overwrite the bibliographic fields and `updated_at` of an existing
    /// book. Fails with [`ErrorKind::NoRowsAffected`] if the ID is unknown.
    async fn update(&self, book: &Book) -> Result<()>;

    async fn list(&self, sort: Sort, pagination: Pagination) -> Result<Vec<Book>>;

    /// Books whose title, author, publisher or ISBN contains `query`
    /// (case-insensitively). An empty query matches everything.
    async fn search(&self, query: &str, sort: Sort, pagination: Pagination) -> Result<Vec<Book>>;

    async fn count(&self) -> Result<u64>;

    /// Number of books [`search`](Self::search) would match across all pages.
    async fn count_search(&self, query: &str) -> Result<u64>;

    /// Fails with [`ErrorKind::NotFound`] when no book has this ID.
    async fn get_by_id(&self, id: BookId) -> Result<Book>;

    /// Fails with [`ErrorKind::NotFound`] when no book has this fingerprint.
    async fn get_by_file_hash(&self, file_hash: &str) -> Result<Book>;
}

/// SQLite-backed [`CatalogRepository`].
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_page(&self, sql: String, pattern: Option<&str>, pagination: Pagination) -> Result<Vec<Book>> {
        let mut query = sqlx::query_as::<_, BookRow>(&sql);
        if let Some(pattern) = pattern {
            query = query.bind(pattern);
        }
        let rows = query
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Book::try_from).collect()
    }

    async fn fetch_one(&self, sql: &str, key: &str) -> Result<Book> {
        let row: Option<BookRow> = sqlx::query_as(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.ok_or_raise(|| ErrorKind::NotFound)?.try_into()
    }
}

/// Matched against the lowercased `search_text` column.
fn search_pattern(query: &str) -> String {
    contains_pattern(&query.to_lowercase())
}

fn to_count(count: i64) -> Result<u64> {
    u64::try_from(count).or_raise(|| ErrorKind::InvalidData("row count"))
}

#[async_trait]
impl CatalogRepository for Repository {
    #[instrument(skip_all, fields(id = %book.id, file_hash = %book.file_hash))]
    async fn store(&self, book: &Book) -> Result<()> {
        let row = BookRow::try_from(book)?;
        let search_text = search_text(book);
        let result = sqlx::query(include_str!("../queries/insert_book.sql"))
            .bind(row.id)
            .bind(row.title)
            .bind(row.author)
            .bind(row.publisher)
            .bind(row.year)
            .bind(row.created_at)
            .bind(row.updated_at)
            .bind(row.isbn)
            .bind(row.file_hash)
            .bind(row.file_path)
            .bind(row.cover_path)
            .bind(row.format)
            .bind(search_text)
            .execute(&self.pool)
            .await;
        // The UNIQUE/PRIMARY KEY constraints are the only thing standing
        // between two concurrent uploads of the same file.
        let duplicate = matches!(&result, Err(sqlx::Error::Database(e)) if e.is_unique_violation());
        result.or_raise(|| if duplicate { ErrorKind::AlreadyExists } else { ErrorKind::Database })?;
        Ok(())
    }

    #[instrument(skip_all, fields(id = %book.id))]
    async fn update(&self, book: &Book) -> Result<()> {
        let row = BookRow::try_from(book)?;
        let search_text = search_text(book);
        let result = sqlx::query(include_str!("../queries/update_book.sql"))
            .bind(row.title)
            .bind(row.author)
            .bind(row.publisher)
            .bind(row.year)
            .bind(row.updated_at)
            .bind(row.isbn)
            .bind(search_text)
            .bind(row.id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NoRowsAffected);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(%sort, %pagination))]
    async fn list(&self, sort: Sort, pagination: Pagination) -> Result<Vec<Book>> {
        let sql = format!("{} {} LIMIT ? OFFSET ?", include_str!("../queries/list_books.sql"), sort.order_by());
        self.fetch_page(sql, None, pagination).await
    }

    #[instrument(skip_all, fields(query = %query, %sort, %pagination))]
    async fn search(&self, query: &str, sort: Sort, pagination: Pagination) -> Result<Vec<Book>> {
        let sql = format!("{} {} LIMIT ? OFFSET ?", include_str!("../queries/search_books.sql"), sort.order_by());
        self.fetch_page(sql, Some(&search_pattern(query)), pagination).await
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_books.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        to_count(count)
    }

    #[instrument(skip(self))]
    async fn count_search(&self, query: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_search.sql"))
            .bind(search_pattern(query))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        to_count(count)
    }

    async fn get_by_id(&self, id: BookId) -> Result<Book> {
        self.fetch_one(include_str!("../queries/get_by_id.sql"), &id.to_string()).await
    }

    async fn get_by_file_hash(&self, file_hash: &str) -> Result<Book> {
        self.fetch_one(include_str!("../queries/get_by_file_hash.sql"), file_hash).await
    }
}
