//! PostgreSQL backend.
//!
//! Tables created here use `BIGSERIAL` ids and `TIMESTAMPTZ` columns. A table
//! left by an older deployment (`SERIAL` ids, `TIMESTAMP` columns holding UTC
//! wall-clock values) is used as it is: writes are cast on insert and reads
//! accept either column type.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::error::StoreResult;
use crate::record::CredentialRecord;

const COLUMNS: &str = "id, user_id, token_json, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS credentials (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                token_json TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
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
        let row = sqlx::query(&format!(
            r"
            INSERT INTO credentials (user_id, token_json, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT(user_id) DO UPDATE SET
                token_json = EXCLUDED.token_json,
                updated_at = EXCLUDED.updated_at
            RETURNING {COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(token_json)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    pub async fn get(&self, user_id: &str) -> StoreResult<Option<CredentialRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM credentials WHERE user_id = $1"
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

fn row_to_record(row: &PgRow) -> StoreResult<CredentialRecord> {
    Ok(CredentialRecord {
        id: decode_id(row)?,
        user_id: row.try_get("user_id")?,
        token_json: row.try_get("token_json")?,
        created_at: decode_timestamp(row, "created_at")?,
        updated_at: decode_timestamp(row, "updated_at")?,
    })
}

/// `INT8` from `BIGSERIAL`, or `INT4` from a `SERIAL` table.
fn decode_id(row: &PgRow) -> Result<i64, sqlx::Error> {
    row.try_get::<i64, _>("id")
        .or_else(|_| row.try_get::<i32, _>("id").map(i64::from))
}

/// `TIMESTAMPTZ`, or a zone-less `TIMESTAMP` taken as UTC.
fn decode_timestamp(row: &PgRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    row.try_get::<DateTime<Utc>, _>(column)
        .or_else(|_| row.try_get::<NaiveDateTime, _>(column).map(|t| t.and_utc()))
}
