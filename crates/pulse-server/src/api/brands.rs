//! Brand registry read endpoints plus the live stats read path.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulse_db::BrandRow;
use pulse_metricool::DateWindow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{client_from_credentials, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub struct ListBrandsQuery {
    #[serde(default)]
    include_deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct BrandItem {
    pub id: i64,
    pub label: String,
    pub picture: Option<String>,
    pub timezone: Option<String>,
    pub connected_platforms: Vec<&'static str>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BrandDetail {
    #[serde(flatten)]
    pub summary: BrandItem,
    /// The non-null network handle/id columns, keyed by column name.
    pub networks: BTreeMap<&'static str, String>,
    pub raw_snapshot: Value,
}

/// Live engagement aggregates for one brand over the trailing window,
/// computed from a fresh upstream fetch.
#[derive(Debug, Serialize)]
pub struct BrandStats {
    pub brand_id: i64,
    pub window_from: String,
    pub window_to: String,
    pub posts: usize,
    pub interactions: i64,
    pub impressions: i64,
    pub avg_engagement_rate: f64,
    pub posts_by_platform: BTreeMap<String, usize>,
}

impl BrandItem {
    fn from_row(row: &BrandRow) -> Self {
        Self {
            id: row.id,
            label: row.label.clone(),
            picture: row.picture.clone(),
            timezone: row.timezone.clone(),
            connected_platforms: connected_platforms(row),
            last_synced_at: row.last_synced_at,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn connected_platforms(row: &BrandRow) -> Vec<&'static str> {
    let mut connected = Vec::new();

    let any = |fields: &[&Option<String>]| fields.iter().any(|f| f.is_some());

    if any(&[
        &row.facebook_page_id,
        &row.facebook,
        &row.facebook_group_id,
        &row.facebook_ads,
    ]) {
        connected.push("facebook");
    }
    if any(&[&row.instagram, &row.instagram_business_id]) {
        connected.push("instagram");
    }
    if any(&[&row.tiktok, &row.tiktok_business_id, &row.tiktok_ads]) {
        connected.push("tiktok");
    }
    if any(&[&row.linkedin, &row.linkedin_company]) {
        connected.push("linkedin");
    }
    if any(&[&row.youtube, &row.youtube_channel_id]) {
        connected.push("youtube");
    }
    if any(&[&row.pinterest, &row.pinterest_business_id]) {
        connected.push("pinterest");
    }
    if row.twitter.is_some() {
        connected.push("twitter");
    }
    if row.threads.is_some() {
        connected.push("threads");
    }
    if row.bluesky.is_some() {
        connected.push("bluesky");
    }
    if row.twitch.is_some() {
        connected.push("twitch");
    }

    connected
}

fn networks(row: &BrandRow) -> BTreeMap<&'static str, String> {
    let fields: [(&'static str, &Option<String>); 19] = [
        ("facebook_page_id", &row.facebook_page_id),
        ("facebook", &row.facebook),
        ("facebook_group_id", &row.facebook_group_id),
        ("facebook_ads", &row.facebook_ads),
        ("instagram", &row.instagram),
        ("instagram_business_id", &row.instagram_business_id),
        ("tiktok", &row.tiktok),
        ("tiktok_business_id", &row.tiktok_business_id),
        ("tiktok_ads", &row.tiktok_ads),
        ("linkedin", &row.linkedin),
        ("linkedin_company", &row.linkedin_company),
        ("youtube", &row.youtube),
        ("youtube_channel_id", &row.youtube_channel_id),
        ("pinterest", &row.pinterest),
        ("pinterest_business_id", &row.pinterest_business_id),
        ("twitter", &row.twitter),
        ("threads", &row.threads),
        ("bluesky", &row.bluesky),
        ("twitch", &row.twitch),
    ];

    fields
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
}

pub async fn list_brands(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListBrandsQuery>,
) -> Result<Json<ApiResponse<Vec<BrandItem>>>, ApiError> {
    let rows = pulse_db::list_brands(&state.pool, query.include_deleted)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.iter().map(BrandItem::from_row).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn get_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BrandDetail>>, ApiError> {
    let row = pulse_db::get_brand(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BrandDetail {
            summary: BrandItem::from_row(&row),
            networks: networks(&row),
            raw_snapshot: row.raw_snapshot.clone(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Live stats over the trailing 30 days, fetched from the upstream on
/// every request. An unreachable upstream is surfaced as a structured
/// 502 — no placeholder numbers.
pub async fn brand_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BrandStats>>, ApiError> {
    let brand = pulse_db::get_brand(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let client = client_from_credentials(&state, &req_id.0).await?;
    let window = DateWindow::trailing_days(pulse_sync::POST_WINDOW_DAYS);
    let timezone = brand.timezone.as_deref().unwrap_or("UTC");

    let posts = client
        .list_posts(brand.id, &window, timezone)
        .await
        .map_err(|e| {
            tracing::error!(brand_id = brand.id, error = %e, "stats fetch failed");
            ApiError::new(req_id.0.clone(), "upstream_error", e.to_string())
        })?;

    let mut interactions = 0_i64;
    let mut impressions = 0_i64;
    let mut engagement_sum = 0.0_f64;
    let mut posts_by_platform: BTreeMap<String, usize> = BTreeMap::new();
    for post in &posts {
        interactions += i64::from(post.metrics.interactions_or_zero());
        impressions += i64::from(post.metrics.impressions_or_zero());
        engagement_sum += post.metrics.engagement_or_zero();
        let platform = post
            .network
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
            .to_ascii_lowercase();
        *posts_by_platform.entry(platform).or_default() += 1;
    }
    #[allow(clippy::cast_precision_loss)]
    let avg_engagement_rate = if posts.is_empty() {
        0.0
    } else {
        engagement_sum / posts.len() as f64
    };

    Ok(Json(ApiResponse {
        data: BrandStats {
            brand_id: brand.id,
            window_from: window.from_param(),
            window_to: window.to_param(),
            posts: posts.len(),
            interactions,
            impressions,
            avg_engagement_rate,
            posts_by_platform,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
