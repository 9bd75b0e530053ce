//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Pool tuning for file-backed catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a connection waits on a locked database before giving up
    /// with `SQLITE_BUSY`.
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        // Concurrent uploads and listings, but only one writer in WAL-mode.
        Self { max_connections: 5, busy_timeout: Duration::from_millis(1500) }
    }
}

/// Database connection pool for the catalog.
///
/// The pool is safe to share between concurrently running requests; clone
/// it freely, clones share the same connections.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Per-connection PRAGMAs must run on every pooled connection,
            // not just the first one handed out.
            .after_connect(|conn, meta| Box::pin(async move {
                Self::apply_pragmas(conn, meta).await
            }))
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the catalog database at `path`, creating the file if it
    /// doesn't exist, and run migrations.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn connect_with(path: impl AsRef<Path>, settings: PoolSettings) -> Result<Self> {
        let options = Self::base_options()
            .filename(path.as_ref())
            .create_if_missing(true)
            .busy_timeout(settings.busy_timeout);
        Self::new(options, settings.max_connections.max(1)).await
    }

    /// A throwaway catalog held in memory.
    ///
    /// Public (not `#[cfg(test)]`) so the shelf's tests can build on it. The
    /// data is gone once the pool closes.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Each `:memory:` connection is its own database; a single
        // connection keeps every query looking at the same one.
        Self::new(options, 1).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Listings keep reading while an upload commits.
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            // PRAGMA busy_timeout; overridden by `PoolSettings` for files.
            .busy_timeout(PoolSettings::default().busy_timeout)
            // PRAGMA auto_vacuum = OFF; there is no delete path for books.
            .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::None)
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
                PRAGMA mmap_size = 33554432;
                PRAGMA analysis_limit = 400;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Bring the schema up to date. Runs on every connect.
    #[instrument("performing database migrations")]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// The underlying pool, for [`Repository`](crate::Repository) and for
    /// tests that inspect raw rows.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to come back, then close the pool.
    /// Every clone (and every [`Repository`](crate::Repository) built from
    /// one) is unusable afterwards.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
