use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection pool and run migrations.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InstanceLocked` if another process has the
    /// database locked (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `StorageError::Migration` if the schema could not be created.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks to release
        // before returning SQLITE_BUSY. This handles transient contention
        // between the detection cycle and concurrent management commands.
        // Using pragma() ensures all connections in the pool inherit it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // SQLite is single-writer; a handful of connections covers the
        // detection cycle plus concurrent management commands. A :memory:
        // database exists per connection, so it gets a single-connection
        // pool or every handle would see its own empty database.
        let max_connections = if path.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            // Migration errors could also be lock-related
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
                || error_string.contains("sqlite_busy")
                || error_string.contains("sqlite_locked")
            {
                StorageError::InstanceLocked
            } else {
                StorageError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All schema changes are wrapped in a single transaction so a failure
    /// (disk full, power loss) leaves the database in its previous consistent
    /// state. All statements use `IF NOT EXISTS`, so re-running on an
    /// existing database is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        // Per-connection setting, must stay outside the transaction
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        // The subscriptions table is the entire durable state of the engine.
        // UNIQUE(link, channel_id): a channel may not double-subscribe to the
        // same URL; the insert path relies on this constraint rather than a
        // racy pre-read.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                link TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(link, channel_id)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // channel_id lookups serve the list command; link lookups serve the
        // per-link watermark transaction in the detection cycle.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_channel ON subscriptions(channel_id)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_subscriptions_link ON subscriptions(link)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
