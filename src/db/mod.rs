/// Database layer for the innovation pipeline
///
/// Manages the SQLite connection pool and embedded migrations backing the
/// collection store.

use crate::error::{PipelineError, PipelineResult};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> PipelineResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    sqlx::sqlite::SqliteJournalMode::Wal
                } else {
                    sqlx::sqlite::SqliteJournalMode::Delete
                })
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(PipelineError::Database)?;

    Ok(pool)
}

/// Run migrations
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> PipelineResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| PipelineError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> PipelineResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(PipelineError::Database)?;

    Ok(())
}
