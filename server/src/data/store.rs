//! SQLite store
//!
//! Single relational store backing both the transactional write path and the
//! analytics read path. Optimized for the single-writer deployment model:
//! WAL mode for concurrent reads during writes, in-memory temp storage, and
//! a busy timeout so concurrent worker transactions queue instead of failing.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use super::error::DataError;
use super::schema::SCHEMA;
use crate::core::constants::READ_TIMEOUT_SECS;

const BUSY_TIMEOUT_SECS: u64 = 5;
const MAX_CONNECTIONS: u32 = 8;

/// SQLite store service
///
/// Created once at server startup and shared across all modules.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Initialize the store from a database URL
    ///
    /// Accepts `sqlite://path`, a bare filesystem path, or `sqlite::memory:`.
    /// Creates the database file if missing and applies the schema.
    pub async fn init(database_url: &str) -> Result<Self, DataError> {
        let options = if database_url.contains(":memory:") {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DataError::Config(e.to_string()))?
        } else {
            let path = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
                .unwrap_or(database_url);
            SqliteConnectOptions::new().filename(path)
        };

        let options = options
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
            .pragma("temp_store", "MEMORY");

        // In-memory databases live per-connection; a pool of one keeps the
        // schema visible to every query.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            MAX_CONNECTIONS
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        tracing::debug!(url = database_url, "Store initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Health probe for readiness checks
    pub async fn health(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn checkpoint(&self) -> Result<(), DataError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        tracing::debug!("WAL checkpoint completed");
        Ok(())
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Store pool closed");
    }
}

/// Bound a read-path query by the HTTP read deadline.
///
/// An elapsed deadline maps to `DataError::Timeout`; the caller surfaces it
/// as 504 distinct from storage failures.
pub async fn with_read_timeout<T, F>(fut: F) -> Result<T, DataError>
where
    F: std::future::Future<Output = Result<T, DataError>>,
{
    match tokio::time::timeout(Duration::from_secs(READ_TIMEOUT_SECS), fut).await {
        Ok(result) => result,
        Err(_) => Err(DataError::timeout(READ_TIMEOUT_SECS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_memory_store() {
        let store = Store::init("sqlite::memory:").await.unwrap();
        store.health().await.unwrap();
        store.close().await;
    }

    #[tokio::test]
    async fn test_init_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let url = format!("sqlite://{}", path.display());

        let store = Store::init(&url).await.unwrap();
        store.health().await.unwrap();
        store.checkpoint().await.unwrap();
        store.close().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let store = Store::init("sqlite::memory:").await.unwrap();
        sqlx::raw_sql(SCHEMA).execute(store.pool()).await.unwrap();
        store.close().await;
    }

    #[tokio::test]
    async fn test_with_read_timeout_passthrough() {
        let result: Result<u32, DataError> = with_read_timeout(async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
