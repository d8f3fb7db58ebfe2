mod error;
pub mod repos;
pub mod schema;
pub mod sqlite;

#[cfg(test)]
pub mod tests;

use std::{sync::Arc, time::Duration};

pub use error::{DbError, DbResult};
pub use repos::*;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::config::StorageConfig;

/// Cached repository trait objects, created once per store.
struct CachedRepos {
    runs: Arc<dyn RunRepo>,
    orders: Arc<dyn OrderRepo>,
    backups: Arc<dyn BackupRepo>,
}

impl CachedRepos {
    fn sqlite(pool: &SqlitePool) -> Self {
        Self {
            runs: Arc::new(sqlite::SqliteRunRepo::new(pool.clone())),
            orders: Arc::new(sqlite::SqliteOrderRepo::new(pool.clone())),
            backups: Arc::new(sqlite::SqliteBackupRepo::new(pool.clone())),
        }
    }
}

/// Handle on the live order store.
///
/// One instance is opened per operation and released with [`OrderStore::close`]
/// when that operation ends. The pool holds a single connection with
/// foreign-key enforcement switched on, which the cascading run deletion
/// depends on.
pub struct OrderStore {
    pool: SqlitePool,
    repos: CachedRepos,
}

impl OrderStore {
    /// Open (creating if allowed) the store file described by `config` and
    /// make sure both tables exist.
    pub async fn open(config: &StorageConfig) -> DbResult<Self> {
        let path = config.database_path();

        if config.create_if_missing && !config.output_dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&config.output_dir).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(config.create_if_missing)
                    .foreign_keys(true)
                    .busy_timeout(Duration::from_millis(config.busy_timeout_ms)),
            )
            .await
            .inspect_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "Failed to open order store")
            })?;

        tracing::debug!(path = %path.display(), "Opened order store");
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    ///
    /// The pool must enforce foreign keys for retention to cascade.
    pub async fn from_pool(pool: SqlitePool) -> DbResult<Self> {
        schema::ensure_schema(&pool).await?;
        let repos = CachedRepos::sqlite(&pool);
        Ok(Self { pool, repos })
    }

    /// Get run repository
    pub fn runs(&self) -> Arc<dyn RunRepo> {
        Arc::clone(&self.repos.runs)
    }

    /// Get order repository
    pub fn orders(&self) -> Arc<dyn OrderRepo> {
        Arc::clone(&self.repos.orders)
    }

    /// Get backup repository
    pub fn backups(&self) -> Arc<dyn BackupRepo> {
        Arc::clone(&self.repos.backups)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Release the connection. Consumes the store so it cannot be reused.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Closed order store");
    }
}
