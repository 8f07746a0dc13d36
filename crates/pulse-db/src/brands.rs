//! Database operations for the `brands` registry table.
//!
//! The primary key is the external analytics source's numeric id — it is
//! the join key for every other table, so inserts carry the id explicitly
//! and conflicts on it drive the upsert.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

const BRAND_COLUMNS: &str = "id, label, picture, timezone, \
     facebook_page_id, facebook, facebook_group_id, facebook_ads, \
     instagram, instagram_business_id, \
     tiktok, tiktok_business_id, tiktok_ads, \
     linkedin, linkedin_company, \
     youtube, youtube_channel_id, \
     pinterest, pinterest_business_id, \
     twitter, threads, bluesky, twitch, \
     raw_snapshot, last_synced_at, deleted_at, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub label: String,
    pub picture: Option<String>,
    pub timezone: Option<String>,
    pub facebook_page_id: Option<String>,
    pub facebook: Option<String>,
    pub facebook_group_id: Option<String>,
    pub facebook_ads: Option<String>,
    pub instagram: Option<String>,
    pub instagram_business_id: Option<String>,
    pub tiktok: Option<String>,
    pub tiktok_business_id: Option<String>,
    pub tiktok_ads: Option<String>,
    pub linkedin: Option<String>,
    pub linkedin_company: Option<String>,
    pub youtube: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub pinterest: Option<String>,
    pub pinterest_business_id: Option<String>,
    pub twitter: Option<String>,
    pub threads: Option<String>,
    pub bluesky: Option<String>,
    pub twitch: Option<String>,
    pub raw_snapshot: Value,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The id/soft-delete pair used by the brand sync diff.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct BrandState {
    pub id: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The writable columns of a brand, as normalized from an upstream profile.
#[derive(Debug, Clone, Default)]
pub struct NewBrand {
    pub id: i64,
    pub label: String,
    pub picture: Option<String>,
    pub timezone: Option<String>,
    pub facebook_page_id: Option<String>,
    pub facebook: Option<String>,
    pub facebook_group_id: Option<String>,
    pub facebook_ads: Option<String>,
    pub instagram: Option<String>,
    pub instagram_business_id: Option<String>,
    pub tiktok: Option<String>,
    pub tiktok_business_id: Option<String>,
    pub tiktok_ads: Option<String>,
    pub linkedin: Option<String>,
    pub linkedin_company: Option<String>,
    pub youtube: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub pinterest: Option<String>,
    pub pinterest_business_id: Option<String>,
    pub twitter: Option<String>,
    pub threads: Option<String>,
    pub bluesky: Option<String>,
    pub twitch: Option<String>,
    pub raw_snapshot: Value,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upserts a brand keyed on the external id.
///
/// On conflict every column is overwritten from the incoming record,
/// `last_synced_at` is refreshed, and `deleted_at` is cleared — a brand
/// that reappears upstream comes back to life.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_brand(pool: &PgPool, brand: &NewBrand) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO brands \
             (id, label, picture, timezone, \
              facebook_page_id, facebook, facebook_group_id, facebook_ads, \
              instagram, instagram_business_id, \
              tiktok, tiktok_business_id, tiktok_ads, \
              linkedin, linkedin_company, \
              youtube, youtube_channel_id, \
              pinterest, pinterest_business_id, \
              twitter, threads, bluesky, twitch, \
              raw_snapshot, last_synced_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19, $20, $21, $22, $23, $24, NOW()) \
         ON CONFLICT (id) DO UPDATE SET \
             label                 = EXCLUDED.label, \
             picture               = EXCLUDED.picture, \
             timezone              = EXCLUDED.timezone, \
             facebook_page_id      = EXCLUDED.facebook_page_id, \
             facebook              = EXCLUDED.facebook, \
             facebook_group_id     = EXCLUDED.facebook_group_id, \
             facebook_ads          = EXCLUDED.facebook_ads, \
             instagram             = EXCLUDED.instagram, \
             instagram_business_id = EXCLUDED.instagram_business_id, \
             tiktok                = EXCLUDED.tiktok, \
             tiktok_business_id    = EXCLUDED.tiktok_business_id, \
             tiktok_ads            = EXCLUDED.tiktok_ads, \
             linkedin              = EXCLUDED.linkedin, \
             linkedin_company      = EXCLUDED.linkedin_company, \
             youtube               = EXCLUDED.youtube, \
             youtube_channel_id    = EXCLUDED.youtube_channel_id, \
             pinterest             = EXCLUDED.pinterest, \
             pinterest_business_id = EXCLUDED.pinterest_business_id, \
             twitter               = EXCLUDED.twitter, \
             threads               = EXCLUDED.threads, \
             bluesky               = EXCLUDED.bluesky, \
             twitch                = EXCLUDED.twitch, \
             raw_snapshot          = EXCLUDED.raw_snapshot, \
             last_synced_at        = NOW(), \
             deleted_at            = NULL, \
             updated_at            = NOW()",
    )
    .bind(brand.id)
    .bind(&brand.label)
    .bind(&brand.picture)
    .bind(&brand.timezone)
    .bind(&brand.facebook_page_id)
    .bind(&brand.facebook)
    .bind(&brand.facebook_group_id)
    .bind(&brand.facebook_ads)
    .bind(&brand.instagram)
    .bind(&brand.instagram_business_id)
    .bind(&brand.tiktok)
    .bind(&brand.tiktok_business_id)
    .bind(&brand.tiktok_ads)
    .bind(&brand.linkedin)
    .bind(&brand.linkedin_company)
    .bind(&brand.youtube)
    .bind(&brand.youtube_channel_id)
    .bind(&brand.pinterest)
    .bind(&brand.pinterest_business_id)
    .bind(&brand.twitter)
    .bind(&brand.threads)
    .bind(&brand.bluesky)
    .bind(&brand.twitch)
    .bind(&brand.raw_snapshot)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the id and soft-delete state of every brand in the registry.
/// The brand sync diffs this against the fetched upstream list.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brand_states(pool: &PgPool) -> Result<Vec<BrandState>, DbError> {
    let rows = sqlx::query_as::<_, BrandState>("SELECT id, deleted_at FROM brands")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns all non-soft-deleted brands, ordered by label.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_brands(pool: &PgPool) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE deleted_at IS NULL ORDER BY label, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all brands, optionally including soft-deleted ones.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands(pool: &PgPool, include_deleted: bool) -> Result<Vec<BrandRow>, DbError> {
    if include_deleted {
        let rows = sqlx::query_as::<_, BrandRow>(&format!(
            "SELECT {BRAND_COLUMNS} FROM brands ORDER BY label, id"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    } else {
        list_active_brands(pool).await
    }
}

/// Returns a single brand by external id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_brand(pool: &PgPool, id: i64) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns a single non-soft-deleted brand by external id.
///
/// Soft-deleted rows are treated as absent, matching the brand set the
/// post sync iterates in all-brands mode.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no active row exists with the given
/// `id`, or [`DbError::Sqlx`] if the query fails.
pub async fn get_active_brand(pool: &PgPool, id: i64) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Soft-deletes every non-deleted brand whose id is absent from `seen_ids`.
/// Returns the number of rows marked.
///
/// Absence from a successful full fetch is the authoritative deletion
/// signal; rows are only marked, never removed here.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_missing_brands_deleted(
    pool: &PgPool,
    seen_ids: &[i64],
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE brands \
         SET deleted_at = NOW(), updated_at = NOW() \
         WHERE deleted_at IS NULL AND id <> ALL($1)",
    )
    .bind(seen_ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Hard-deletes brands soft-deleted more than `retention_days` days ago.
/// Returns the number of rows purged.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn purge_soft_deleted(pool: &PgPool, retention_days: i32) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM brands \
         WHERE deleted_at IS NOT NULL \
           AND deleted_at < NOW() - make_interval(days => $1)",
    )
    .bind(retention_days)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
