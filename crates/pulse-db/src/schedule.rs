//! Database operations for the `sync_schedule` singleton.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// The singleton row from `sync_schedule`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub interval_hours: i32,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Returns the schedule, or `None` if never configured.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_schedule(pool: &PgPool) -> Result<Option<ScheduleRow>, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(
        "SELECT interval_hours, enabled, last_run_at, next_run_at, updated_at \
         FROM sync_schedule WHERE id",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Enables automatic syncing at `interval_hours`, recomputing
/// `next_run_at = NOW() + interval_hours` as of the save.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn enable_schedule(pool: &PgPool, interval_hours: i32) -> Result<ScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(
        "INSERT INTO sync_schedule (id, interval_hours, enabled, next_run_at) \
         VALUES (TRUE, $1, TRUE, NOW() + make_interval(hours => $1)) \
         ON CONFLICT (id) DO UPDATE SET \
             interval_hours = EXCLUDED.interval_hours, \
             enabled        = TRUE, \
             next_run_at    = NOW() + make_interval(hours => $1), \
             updated_at     = NOW() \
         RETURNING interval_hours, enabled, last_run_at, next_run_at, updated_at",
    )
    .bind(interval_hours)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Disables automatic syncing and clears `next_run_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn disable_schedule(pool: &PgPool) -> Result<ScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(
        "INSERT INTO sync_schedule (id, enabled, next_run_at) \
         VALUES (TRUE, FALSE, NULL) \
         ON CONFLICT (id) DO UPDATE SET \
             enabled     = FALSE, \
             next_run_at = NULL, \
             updated_at  = NOW() \
         RETURNING interval_hours, enabled, last_run_at, next_run_at, updated_at",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Records that an automatic run just happened: `last_run_at = NOW()` and
/// `next_run_at = NOW() + interval_hours`. Called regardless of the run's
/// own success or failure so a broken upstream cannot wedge the schedule.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the schedule row does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_schedule_ran(pool: &PgPool) -> Result<ScheduleRow, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(
        "UPDATE sync_schedule \
         SET last_run_at = NOW(), \
             next_run_at = NOW() + make_interval(hours => interval_hours), \
             updated_at  = NOW() \
         WHERE id \
         RETURNING interval_hours, enabled, last_run_at, next_run_at, updated_at",
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
