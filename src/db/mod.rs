pub mod bookmark_service;
pub mod models;

use std::path::Path;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Sqlite;
use tracing::{debug, error, info};

use crate::error::{ServiceError, StartupError};

const SCHEMA: &str = include_str!("../../migrations/20250101000000_create_bookmarks_table.sql");

/// Pooled handle to the bookmark database. Cheap to clone; every clone shares
/// the same pool.
#[derive(Clone, Debug)]
pub struct BookmarkDb {
    pool: SqlitePool,
}

impl BookmarkDb {
    /// Opens (creating if missing) the SQLite file at `path`. The parent
    /// directory has to exist already.
    pub async fn open(path: &Path) -> Result<Self, StartupError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(|source| {
            error!(path = %path.display(), error = %source, "Failed to open database.");
            StartupError::OpenStorage {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!(path = %path.display(), "Opened bookmark database.");
        Ok(Self { pool })
    }

    pub async fn apply_schema(&self) -> Result<(), StartupError> {
        info!("Applying bookmark schema...");
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to apply bookmark schema.");
                StartupError::Schema(e)
            })?;
        info!("Bookmark schema is up to date.");
        Ok(())
    }

    /// Borrows one connection from the pool. It goes back to the pool when the
    /// returned handle is dropped.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, ServiceError> {
        let conn = self.pool.acquire().await.map_err(ServiceError::Connection)?;
        debug!(
            idle = self.pool.num_idle(),
            size = self.pool.size(),
            "Acquired database connection."
        );
        Ok(conn)
    }

    /// Closes the pool once every borrowed connection has been returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Bookmark database closed.");
    }
}
