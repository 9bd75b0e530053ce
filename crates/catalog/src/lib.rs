//! SQLite catalog of ingested books.
//!
//! The catalog is the index over the blob store: one row per book, keyed by a
//! time-ordered ID and unique on the content fingerprint. The uniqueness
//! constraint, not any pre-insert lookup, is what keeps concurrent uploads of
//! the same file from producing two rows.

mod book;
mod db;
pub mod error;
mod models;
mod query;
mod repo;

pub use crate::book::{Book, BookId};
pub use crate::db::{Database, PoolSettings};
pub use crate::query::{DEFAULT_PER_PAGE, MAX_PER_PAGE, Pagination, Sort, SortBy, SortOrder};
pub use crate::repo::{CatalogRepository, Repository};
