//! Book ingestion and retrieval.
//!
//! [`BookShelf`] is the entry point: it fingerprints uploads, extracts their
//! metadata, files them into blob storage and records them in the catalog.

pub mod error;
mod fingerprint;
mod id;
mod keys;
mod page;
mod patch;
mod shelf;

pub use crate::fingerprint::partial_md5;
pub use crate::id::{Clock, IdGenerator, SystemClock, UuidV7};
pub use crate::page::PaginatedBookList;
pub use crate::patch::BookPatch;
pub use crate::shelf::{BookShelf, Stored};
