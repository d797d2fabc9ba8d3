use std::fs;
use std::path::Path;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};

use crate::error::{Error, Result};

pub mod tokens;
pub use tokens::{delete_tokens, get_tokens, set_tokens};

pub type Pool = SqlitePool;

pub async fn init_db(db_path: &Path) -> Result<Pool> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::Configuration(format!(
                "failed to create data directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    sqlx::query(
        r#"
      CREATE TABLE IF NOT EXISTS tokens (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        access_token TEXT NOT NULL,
        refresh_token TEXT,
        expires_at INTEGER NOT NULL
      )
    "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
