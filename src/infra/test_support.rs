// Shared helpers for the SQLite store tests.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

/// Open a pool on a fresh database file. Keep the TempDir alive for as long
/// as the pool is used.
pub async fn temp_pool() -> (TempDir, Pool<Sqlite>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("feed.db").display());
    let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
    (dir, pool)
}
