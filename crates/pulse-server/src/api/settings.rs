//! Credentials and schedule settings endpoints.

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{client_from_credentials, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

const ALLOWED_INTERVALS: [i32; 2] = [12, 24];
const DEFAULT_INTERVAL_HOURS: i32 = 24;

/// The credentials view returned to operators. The access token is never
/// echoed back in full.
#[derive(Debug, Serialize)]
pub struct CredentialsView {
    pub configured: bool,
    pub account_id: Option<String>,
    pub access_token_masked: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCredentialsBody {
    pub access_token: String,
    pub account_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionTest {
    pub ok: bool,
    pub brand_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub enabled: bool,
    pub interval_hours: i32,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleBody {
    pub enabled: bool,
    pub interval_hours: Option<i32>,
}

/// Keeps the last four characters so operators can tell tokens apart.
/// Tokens of four characters or fewer are masked entirely.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("****{visible}")
}

pub async fn get_credentials(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CredentialsView>>, ApiError> {
    let creds = pulse_db::get_credentials(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let view = match creds {
        Some(creds) => CredentialsView {
            configured: true,
            account_id: Some(creds.account_id),
            access_token_masked: Some(mask_token(&creds.access_token)),
        },
        None => CredentialsView {
            configured: false,
            account_id: None,
            access_token_masked: None,
        },
    };

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn put_credentials(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<UpdateCredentialsBody>,
) -> Result<Json<ApiResponse<CredentialsView>>, ApiError> {
    let access_token = body.access_token.trim();
    let account_id = body.account_id.trim();
    if access_token.is_empty() || account_id.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "access_token and account_id must both be non-empty",
        ));
    }

    pulse_db::save_credentials(&state.pool, access_token, account_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: CredentialsView {
            configured: true,
            account_id: Some(account_id.to_string()),
            access_token_masked: Some(mask_token(access_token)),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `POST /api/v1/settings/credentials/test` — live check of the stored
/// credentials against the upstream. Failures surface as structured
/// errors rather than a degraded `ok: false`.
pub async fn test_credentials(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ConnectionTest>>, ApiError> {
    let client = client_from_credentials(&state, &req_id.0).await?;

    let records = client.list_brand_profiles().await.map_err(|e| {
        tracing::warn!(error = %e, "credentials test failed");
        ApiError::new(req_id.0.clone(), "upstream_error", e.to_string())
    })?;

    Ok(Json(ApiResponse {
        data: ConnectionTest {
            ok: true,
            brand_count: records.len(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ScheduleView>>, ApiError> {
    let schedule = pulse_db::get_schedule(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let view = match schedule {
        Some(row) => ScheduleView {
            enabled: row.enabled,
            interval_hours: row.interval_hours,
            last_run_at: row.last_run_at,
            next_run_at: row.next_run_at,
        },
        None => ScheduleView {
            enabled: false,
            interval_hours: DEFAULT_INTERVAL_HOURS,
            last_run_at: None,
            next_run_at: None,
        },
    };

    Ok(Json(ApiResponse {
        data: view,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `PUT /api/v1/settings/schedule` — enabling (re)computes `next_run_at`
/// from now; disabling clears it.
pub async fn put_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<UpdateScheduleBody>,
) -> Result<Json<ApiResponse<ScheduleView>>, ApiError> {
    let row = if body.enabled {
        let interval = body.interval_hours.unwrap_or(DEFAULT_INTERVAL_HOURS);
        if !ALLOWED_INTERVALS.contains(&interval) {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("interval_hours must be one of {ALLOWED_INTERVALS:?}, got {interval}"),
            ));
        }
        pulse_db::enable_schedule(&state.pool, interval)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    } else {
        pulse_db::disable_schedule(&state.pool)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
    };

    Ok(Json(ApiResponse {
        data: ScheduleView {
            enabled: row.enabled,
            interval_hours: row.interval_hours,
            last_run_at: row.last_run_at,
            next_run_at: row.next_run_at,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
