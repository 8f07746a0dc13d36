//! Database operations for the `api_credentials` singleton.
//!
//! A single-row table (`id BOOLEAN PRIMARY KEY CHECK (id)`) holding the
//! current `{access_token, account_id}` pair. Never versioned; the newest
//! value is always authoritative.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// The singleton row from `api_credentials`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialsRow {
    pub access_token: String,
    pub account_id: String,
    pub updated_at: DateTime<Utc>,
}

/// Returns the stored credential pair, or `None` if never configured.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_credentials(pool: &PgPool) -> Result<Option<CredentialsRow>, DbError> {
    let row = sqlx::query_as::<_, CredentialsRow>(
        "SELECT access_token, account_id, updated_at FROM api_credentials WHERE id",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Saves the credential pair, overwriting any previous value.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_credentials(
    pool: &PgPool,
    access_token: &str,
    account_id: &str,
) -> Result<CredentialsRow, DbError> {
    let row = sqlx::query_as::<_, CredentialsRow>(
        "INSERT INTO api_credentials (id, access_token, account_id) \
         VALUES (TRUE, $1, $2) \
         ON CONFLICT (id) DO UPDATE SET \
             access_token = EXCLUDED.access_token, \
             account_id   = EXCLUDED.account_id, \
             updated_at   = NOW() \
         RETURNING access_token, account_id, updated_at",
    )
    .bind(access_token)
    .bind(account_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
