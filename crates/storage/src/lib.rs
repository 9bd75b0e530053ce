//! Blob storage for book files and cover images.
//!
//! Everything the library stores outside of the catalog database goes through
//! a [`StorageBackend`]: a key-addressed store where keys are relative,
//! validated paths such as `2024/05/17/<id>.epub` or `covers/<id>.jpg`.

pub mod backend;
pub mod error;
mod path;

pub use crate::backend::{BoxSyncRead, StorageBackend};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
