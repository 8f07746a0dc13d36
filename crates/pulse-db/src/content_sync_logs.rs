//! Database operations for the `content_sync_logs` table.
//!
//! One append-only row per Post Sync Job invocation. `brand_id` is NULL
//! when the run covered all brands.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `content_sync_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentSyncLogRow {
    pub id: i64,
    pub brand_id: Option<i64>,
    pub platform: String,
    pub posts_fetched: i32,
    pub errors: Option<Value>,
    pub raw_response: Value,
    pub synced_at: DateTime<Utc>,
}

/// The writable columns of a content sync log entry.
#[derive(Debug, Clone)]
pub struct NewContentSyncLog {
    pub brand_id: Option<i64>,
    pub platform: String,
    pub posts_fetched: i32,
    pub errors: Option<Value>,
    pub raw_response: Value,
}

/// Appends a content sync log row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_content_sync_log(
    pool: &PgPool,
    log: &NewContentSyncLog,
) -> Result<ContentSyncLogRow, DbError> {
    let row = sqlx::query_as::<_, ContentSyncLogRow>(
        "INSERT INTO content_sync_logs \
             (brand_id, platform, posts_fetched, errors, raw_response) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, brand_id, platform, posts_fetched, errors, raw_response, synced_at",
    )
    .bind(log.brand_id)
    .bind(&log.platform)
    .bind(log.posts_fetched)
    .bind(&log.errors)
    .bind(&log.raw_response)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent `limit` content sync log rows, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_sync_logs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ContentSyncLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentSyncLogRow>(
        "SELECT id, brand_id, platform, posts_fetched, errors, raw_response, synced_at \
         FROM content_sync_logs \
         ORDER BY synced_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
