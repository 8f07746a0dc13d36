//! Database operations for the `sync_runs` log table.
//!
//! One row per Brand Sync Job invocation: created as `running` when the
//! job starts and driven to exactly one terminal state (`success` or
//! `failed`) before the job returns.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub source: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created: i32,
    pub updated: i32,
    pub marked_deleted: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Creates a new sync run in `running` status with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_sync_run(pool: &PgPool, source: &str) -> Result<SyncRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SyncRunRow>(
        "INSERT INTO sync_runs (public_id, source, status) \
         VALUES ($1, $2, 'running') \
         RETURNING id, public_id, source, status, started_at, finished_at, \
                   created, updated, marked_deleted, error_message, created_at",
    )
    .bind(public_id)
    .bind(source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `success` with its counts and `finished_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    created: i32,
    updated: i32,
    marked_deleted: i32,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE sync_runs \
         SET status = 'success', finished_at = NOW(), \
             created = $1, updated = $2, marked_deleted = $3 \
         WHERE id = $4",
    )
    .bind(created)
    .bind(updated)
    .bind(marked_deleted)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Marks a run as `failed` with `error_message` and `finished_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', finished_at = NOW(), error_message = $1 \
         WHERE id = $2",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(
        "SELECT id, public_id, source, status, started_at, finished_at, \
                created, updated, marked_deleted, error_message, created_at \
         FROM sync_runs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(
        "SELECT id, public_id, source, status, started_at, finished_at, \
                created, updated, marked_deleted, error_message, created_at \
         FROM sync_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
