//! Database operations for the `posts` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub metricool_id: String,
    pub brand_id: i64,
    pub platform: String,
    pub content: Option<String>,
    pub link: Option<String>,
    pub picture: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub interactions: i32,
    pub impressions: i32,
    pub engagement_rate: f64,
    pub platform_detail: Option<Value>,
    pub synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The writable columns of a post, as normalized from an upstream record.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub metricool_id: String,
    pub brand_id: i64,
    pub platform: String,
    pub content: Option<String>,
    pub link: Option<String>,
    pub picture: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub timezone: Option<String>,
    pub interactions: i32,
    pub impressions: i32,
    pub engagement_rate: f64,
    pub platform_detail: Option<Value>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upserts a post keyed on `(metricool_id, brand_id)`.
///
/// Conflicts overwrite every metric and content column and refresh
/// `synced_at`, so re-syncing the same window converges on the latest
/// upstream values.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_post(pool: &PgPool, post: &NewPost) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO posts \
             (metricool_id, brand_id, platform, content, link, picture, \
              published_at, timezone, interactions, impressions, engagement_rate, \
              platform_detail) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (metricool_id, brand_id) DO UPDATE SET \
             platform        = EXCLUDED.platform, \
             content         = EXCLUDED.content, \
             link            = EXCLUDED.link, \
             picture         = EXCLUDED.picture, \
             published_at    = EXCLUDED.published_at, \
             timezone        = EXCLUDED.timezone, \
             interactions    = EXCLUDED.interactions, \
             impressions     = EXCLUDED.impressions, \
             engagement_rate = EXCLUDED.engagement_rate, \
             platform_detail = EXCLUDED.platform_detail, \
             synced_at       = NOW(), \
             updated_at      = NOW()",
    )
    .bind(&post.metricool_id)
    .bind(post.brand_id)
    .bind(&post.platform)
    .bind(&post.content)
    .bind(&post.link)
    .bind(&post.picture)
    .bind(post.published_at)
    .bind(&post.timezone)
    .bind(post.interactions)
    .bind(post.impressions)
    .bind(post.engagement_rate)
    .bind(&post.platform_detail)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the most recent `limit` posts for a brand, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_posts(
    pool: &PgPool,
    brand_id: i64,
    limit: i64,
) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, metricool_id, brand_id, platform, content, link, picture, \
                published_at, timezone, interactions, impressions, engagement_rate, \
                platform_detail, synced_at, created_at, updated_at \
         FROM posts \
         WHERE brand_id = $1 \
         ORDER BY published_at DESC NULLS LAST, id DESC \
         LIMIT $2",
    )
    .bind(brand_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
