//! `HashMap`-backed storage for tests in this and downstream crates.

use crate::StorageBackend;
use crate::backend::BoxSyncRead;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Blobs are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Writes below a
/// configured prefix can be made to fail, and reads are counted, so tests can
/// assert on partial-failure handling without a real filesystem.
///
/// # Examples
///
/// ```
/// use libris_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("covers/abc.jpg", b"\xff\xd8\xff"),
/// ]);
/// assert!(backend.exists(Path::new("covers/abc.jpg")).await?);
///
/// backend.write(Path::new("2024/05/17/abc.epub"), b"PK...").await?;
/// assert!(backend.exists(Path::new("2024/05/17/abc.epub")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    failing_prefix: Option<PathBuf>,
    reads: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with blobs.
    ///
    /// Panics on an invalid key: a broken fixture should fail the test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            failing_prefix: None,
            reads: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every write whose key starts with `prefix` fail with
    /// [`BackendError`](ErrorKind::BackendError).
    ///
    /// ```
    /// use libris_storage::backend::{MockBackend, StorageBackend};
    /// use std::path::Path;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let backend = MockBackend::default().failing_writes_under("covers");
    /// assert!(backend.write(Path::new("covers/abc.jpg"), b"jpg").await.is_err());
    /// assert!(backend.write(Path::new("2024/01/01/abc.pdf"), b"pdf").await.is_ok());
    /// # }
    /// ```
    pub fn failing_writes_under(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.failing_prefix = Some(prefix.into());
        self
    }

    /// Number of `read`/`reader` calls made so far, including failed ones.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Keys of every stored blob, sorted.
    pub async fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<PathBuf> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn fetch(&self, path: &Path) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        Ok(guard.get(&path).cloned().ok_or(ErrorKind::NotFound(path))?)
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.fetch(path).await
    }

    async fn reader(&self, path: &Path) -> Result<BoxSyncRead> {
        Ok(Box::new(Cursor::new(self.fetch(path).await?)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        if let Some(prefix) = &self.failing_prefix
            && path.starts_with(prefix)
        {
            exn::bail!(ErrorKind::BackendError(format!("refusing write to {}", path.display())));
        }
        self.storage.write().await.insert(path, data.to_vec());
        Ok(())
    }
}
