//! The [`StorageBackend`] trait plus local and in-memory implementations.
//!
//! This module defines the `StorageBackend` trait, the port through which book
//! files and cover images are written and read back. The shelf never touches
//! the filesystem for stored data directly.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

/// Blocking reader handed back to callers that stream a stored blob.
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Key-addressed blob store holding book files and cover images.
///
/// Implementations must be safe to share between concurrently running
/// requests; none of the methods take `&mut self`.
///
/// # Keys
/// Keys are relative paths such as `2024/05/17/<id>.epub`. Every
/// implementation runs them through [`validate_path`](crate::validate_path)
/// before touching anything.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use libris_storage::{StorageBackend, error::Result};
///
/// async fn cover_size(backend: &dyn StorageBackend, id: &str) -> Result<u64> {
///     let key = format!("covers/{id}.jpg");
///     if backend.exists(Path::new(&key)).await? {
///         Ok(backend.read(Path::new(&key)).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Check if a blob exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read blob contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open a blob for streaming reads.
    ///
    /// Returns a `'static` boxed [`Read`](std::io::Read) suitable for use
    /// inside [`spawn_blocking`](tokio::task::spawn_blocking). The async
    /// setup (opening the file/connection) happens before returning.
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use libris_storage::{StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut reader = backend.reader(Path::new("2024/05/17/book.epub")).await?;
    /// let copied = tokio::task::spawn_blocking(move || {
    ///     std::io::copy(&mut reader, &mut std::io::sink())
    /// }).await.unwrap().unwrap();
    /// # Ok(())
    /// # }
    /// ```
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Write blob contents, overwriting anything already stored at `path`.
    ///
    /// Implementations should create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Store the contents of a local file (an upload staged on disk) at `path`.
    ///
    /// The default implementation reads the whole source into memory and
    /// delegates to [`write()`](Self::write). Backends that can do better
    /// (copying on the same filesystem, multipart uploads) should override it.
    async fn put_file(&self, source: &Path, path: &Path) -> Result<()> {
        let data = tokio::fs::read(source).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(source.to_path_buf()),
            _ => ErrorKind::Io(e),
        })?;
        self.write(path, &data).await
    }
}
