//! SQLite backend.
//!
//! Timestamps are stored as fixed-width RFC 3339 text.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use crate::error::StoreResult;
use crate::record::{timestamp_from_text, timestamp_to_text, CredentialRecord};

const COLUMNS: &str = "id, user_id, token_json, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database is a separate database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE,
                token_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_credentials_user_id ON credentials(user_id)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn upsert(
        &self,
        user_id: &str,
        token_json: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<CredentialRecord> {
        let now = timestamp_to_text(now);
        let row = sqlx::query(&format!(
            r"
            INSERT INTO credentials (user_id, token_json, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                token_json = excluded.token_json,
                updated_at = excluded.updated_at
            RETURNING {COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(token_json)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    pub async fn get(&self, user_id: &str) -> StoreResult<Option<CredentialRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM credentials WHERE user_id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    pub async fn latest(&self) -> StoreResult<Option<CredentialRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM credentials ORDER BY updated_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM credentials")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_record(row: &SqliteRow) -> StoreResult<CredentialRecord> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(CredentialRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_json: row.try_get("token_json")?,
        created_at: timestamp_from_text(&created_at)?,
        updated_at: timestamp_from_text(&updated_at)?,
    })
}
