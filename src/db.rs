use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

use crate::AppResult;

/// How many messages a snapshot carries.
pub const SNAPSHOT_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

/// Append-only message log for one room, backed by its own sqlite file.
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    pub async fn open(data_dir: &Path, room: &str) -> AppResult<Self> {
        tokio::fs::create_dir_all(data_dir).await?;

        let path = data_dir.join(format!("{room}.db"));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn append(&self, author: &str, body: &str) -> AppResult<Message> {
        let id = sqlx::query("INSERT INTO messages (author, body) VALUES (?, ?)")
            .bind(author)
            .bind(body)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        let (id, author, body, created_at): (i64, String, String, String) =
            sqlx::query_as("SELECT id, author, body, created_at FROM messages WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Message { id, author, body, created_at })
    }

    /// The newest `limit` messages, oldest first.
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<Message>> {
        let mut rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, author, body, created_at FROM messages ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();

        Ok(rows
            .into_iter()
            .map(|(id, author, body, created_at)| Message { id, author, body, created_at })
            .collect())
    }
}
