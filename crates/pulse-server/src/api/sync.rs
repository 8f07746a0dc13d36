//! Sync trigger and run/log inspection endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use pulse_db::{ContentSyncLogRow, SyncRunRow};
use pulse_sync::{BrandScope, BrandSyncOutcome, PostSyncReport, TriggerSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    map_db_error, map_sync_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta,
};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub struct SyncOutcomeBody {
    pub run_id: i64,
    pub total_fetched: usize,
    pub created: i32,
    pub updated: i32,
    pub marked_deleted: i32,
    pub skipped: i32,
}

impl From<BrandSyncOutcome> for SyncOutcomeBody {
    fn from(outcome: BrandSyncOutcome) -> Self {
        Self {
            run_id: outcome.run_id,
            total_fetched: outcome.total_fetched,
            created: outcome.created,
            updated: outcome.updated,
            marked_deleted: outcome.marked_deleted,
            skipped: outcome.skipped,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostSyncBody {
    pub total_fetched: usize,
    pub total_stored: usize,
    pub log_id: Option<i64>,
    pub brands: Vec<BrandPostsItem>,
}

#[derive(Debug, Serialize)]
pub struct BrandPostsItem {
    pub brand_id: i64,
    pub fetched: usize,
    pub stored: usize,
    pub errors: Vec<String>,
}

impl From<PostSyncReport> for PostSyncBody {
    fn from(report: PostSyncReport) -> Self {
        Self {
            total_fetched: report.total_fetched,
            total_stored: report.total_stored,
            log_id: report.log_id,
            brands: report
                .brands
                .into_iter()
                .map(|b| BrandPostsItem {
                    brand_id: b.brand_id,
                    fetched: b.fetched,
                    stored: b.stored,
                    errors: b.errors,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncRunItem {
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
}

impl From<SyncRunRow> for SyncRunItem {
    fn from(row: SyncRunRow) -> Self {
        Self {
            id: row.id,
            public_id: row.public_id,
            source: row.source,
            status: row.status,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created: row.created,
            updated: row.updated,
            marked_deleted: row.marked_deleted,
            error_message: row.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentLogItem {
    pub id: i64,
    pub brand_id: Option<i64>,
    pub platform: String,
    pub posts_fetched: i32,
    pub errors: Option<Value>,
    pub synced_at: DateTime<Utc>,
}

impl From<ContentSyncLogRow> for ContentLogItem {
    fn from(row: ContentSyncLogRow) -> Self {
        Self {
            id: row.id,
            brand_id: row.brand_id,
            platform: row.platform,
            posts_fetched: row.posts_fetched,
            errors: row.errors,
            synced_at: row.synced_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PostSyncQuery {
    brand_id: Option<i64>,
}

/// `POST /api/v1/sync/brands` — run a full brand sync now.
pub async fn trigger_brand_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SyncOutcomeBody>>, ApiError> {
    let outcome = pulse_sync::run_brand_sync(
        &state.pool,
        &state.sync_config,
        TriggerSource::Manual,
        BrandScope::All,
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `POST /api/v1/brands/{id}/resync` — refresh a single brand from the
/// upstream list without touching the rest of the registry.
pub async fn resync_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SyncOutcomeBody>>, ApiError> {
    let outcome = pulse_sync::run_brand_sync(
        &state.pool,
        &state.sync_config,
        TriggerSource::Manual,
        BrandScope::One(id),
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: outcome.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `POST /api/v1/sync/posts` — run a post sync, optionally scoped to one
/// brand via `?brand_id=`.
pub async fn trigger_post_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PostSyncQuery>,
) -> Result<Json<ApiResponse<PostSyncBody>>, ApiError> {
    let report = pulse_sync::run_post_sync(&state.pool, &state.sync_config, query.brand_id)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: report.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = pulse_db::list_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(SyncRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn get_sync_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SyncRunItem>>, ApiError> {
    let row = pulse_db::get_sync_run(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn list_content_logs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<ContentLogItem>>>, ApiError> {
    let rows = pulse_db::list_content_sync_logs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ContentLogItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
