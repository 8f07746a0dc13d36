mod brands;
mod settings;
mod sync;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sync_config: pulse_sync::SyncConfig,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &pulse_db::DbError) -> ApiError {
    match error {
        pulse_db::DbError::NotFound => {
            ApiError::new(request_id, "not_found", "resource not found")
        }
        _ => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

pub(super) fn map_sync_error(request_id: String, error: &pulse_sync::SyncError) -> ApiError {
    match error {
        pulse_sync::SyncError::Configuration(message) => {
            ApiError::new(request_id, "validation_error", message.clone())
        }
        pulse_sync::SyncError::BrandNotFound(_) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        pulse_sync::SyncError::Upstream(_) => {
            tracing::error!(error = %error, "sync failed against the upstream");
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
        pulse_sync::SyncError::Db(db) => map_db_error(request_id, db),
    }
}

/// Builds a Metricool client from the stored credentials. Missing
/// credentials are an operator configuration problem, reported as a 400.
pub(super) async fn client_from_credentials(
    state: &AppState,
    request_id: &str,
) -> Result<pulse_metricool::MetricoolClient, ApiError> {
    let creds = pulse_db::get_credentials(&state.pool)
        .await
        .map_err(|e| map_db_error(request_id.to_string(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                request_id.to_string(),
                "validation_error",
                "credentials are not configured",
            )
        })?;

    pulse_metricool::MetricoolClient::with_base_url(
        &creds.access_token,
        &creds.account_id,
        state.sync_config.timeout_secs,
        &state.sync_config.base_url,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "could not build upstream client");
        ApiError::new(
            request_id.to_string(),
            "internal_error",
            "could not build upstream client",
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/brands", get(brands::list_brands))
        .route("/api/v1/brands/{id}", get(brands::get_brand))
        .route("/api/v1/brands/{id}/stats", get(brands::brand_stats))
        .route("/api/v1/brands/{id}/resync", post(sync::resync_brand))
        .route("/api/v1/sync/brands", post(sync::trigger_brand_sync))
        .route("/api/v1/sync/posts", post(sync::trigger_post_sync))
        .route("/api/v1/sync/runs", get(sync::list_sync_runs))
        .route("/api/v1/sync/runs/{id}", get(sync::get_sync_run))
        .route("/api/v1/sync/content-logs", get(sync::list_content_logs))
        .route(
            "/api/v1/settings/credentials",
            get(settings::get_credentials).put(settings::put_credentials),
        )
        .route(
            "/api/v1/settings/credentials/test",
            post(settings::test_credentials),
        )
        .route(
            "/api/v1/settings/schedule",
            get(settings::get_schedule).put(settings::put_schedule),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match pulse_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pulse_db::NewBrand;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(pool: sqlx::PgPool, base_url: &str) -> AppState {
        AppState {
            pool,
            sync_config: pulse_sync::SyncConfig {
                base_url: base_url.to_string(),
                timeout_secs: 5,
            },
        }
    }

    fn test_rate_limit() -> RateLimitState {
        RateLimitState::new(1_000, std::time::Duration::from_secs(60))
    }

    fn test_app(state: AppState) -> Router {
        let auth = AuthState::new(&[], true).expect("auth");
        build_app(state, auth, test_rate_limit())
    }

    fn authed_app(state: AppState, key: &str) -> Router {
        let auth = AuthState::new(&[key.to_string()], false).expect("auth");
        build_app(state, auth, test_rate_limit())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    async fn seed_brand(pool: &sqlx::PgPool, id: i64, label: &str) {
        pulse_db::upsert_brand(
            pool,
            &NewBrand {
                id,
                label: label.to_string(),
                instagram: Some(format!("{label}-ig")),
                timezone: Some("UTC".to_string()),
                raw_snapshot: json!({ "id": id, "label": label }),
                ..NewBrand::default()
            },
        )
        .await
        .expect("seed brand");
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_upstream_error_maps_to_bad_gateway() {
        let response = ApiError::new("req-1", "upstream_error", "503 from upstream").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_returns_ok(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"].as_str(), Some("ok"));
        assert!(json["meta"]["request_id"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn protected_routes_reject_missing_tokens_with_the_error_envelope(pool: sqlx::PgPool) {
        let app = authed_app(test_state(pool, "http://127.0.0.1:9"), "secret-key");
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("unauthorized"));
        assert!(
            json["meta"]["request_id"].is_string(),
            "auth rejections carry the same meta as handler errors"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn protected_routes_accept_a_configured_bearer_token(pool: sqlx::PgPool) {
        let app = authed_app(test_state(pool, "http://127.0.0.1:9"), "secret-key");
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .header("authorization", "Bearer secret-key")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_brands_returns_connected_platforms(pool: sqlx::PgPool) {
        seed_brand(&pool, 1, "Acme").await;

        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"].as_i64(), Some(1));
        assert_eq!(data[0]["connected_platforms"], json!(["instagram"]));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_brand_returns_404_for_unknown_id(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands/424242")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn soft_deleted_brands_are_hidden_unless_requested(pool: sqlx::PgPool) {
        seed_brand(&pool, 1, "Alive").await;
        seed_brand(&pool, 2, "Gone").await;
        pulse_db::mark_missing_brands_deleted(&pool, &[1])
            .await
            .expect("soft delete");

        let app = test_app(test_state(pool, "http://127.0.0.1:9"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands?include_deleted=true")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().map(Vec::len), Some(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn credentials_roundtrip_masks_the_token(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/settings/credentials")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "access_token": "mc-secret-1234", "account_id": "777" })
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/settings/credentials")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = body_json(response).await;
        assert_eq!(json["data"]["configured"].as_bool(), Some(true));
        assert_eq!(json["data"]["account_id"].as_str(), Some("777"));
        assert_eq!(
            json["data"]["access_token_masked"].as_str(),
            Some("****1234"),
            "full token must never be echoed"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn empty_credentials_are_rejected(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/settings/credentials")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "access_token": "  ", "account_id": "777" }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn schedule_rejects_unsupported_intervals(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/settings/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "enabled": true, "interval_hours": 6 }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn enabling_the_schedule_sets_next_run(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/v1/settings/schedule")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({ "enabled": true, "interval_hours": 12 }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["enabled"].as_bool(), Some(true));
        assert_eq!(json["data"]["interval_hours"].as_i64(), Some(12));
        assert!(json["data"]["next_run_at"].is_string());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn brand_sync_trigger_without_credentials_is_bad_request(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sync/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn brand_sync_trigger_runs_and_reports_counts(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/simpleProfiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 1, "label": "Acme", "instagram": "acme" }
            ])))
            .mount(&server)
            .await;
        pulse_db::save_credentials(&pool, "token", "777")
            .await
            .expect("save credentials");

        let app = test_app(test_state(pool.clone(), &server.uri()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/sync/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["created"].as_i64(), Some(1));
        assert_eq!(json["data"]["marked_deleted"].as_i64(), Some(0));

        let runs = pulse_db::list_sync_runs(&pool, 10).await.expect("runs");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].source, "manual");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_fail_loud_when_the_upstream_is_down(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/analytics/brand-summary/posts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        seed_brand(&pool, 7, "Acme").await;
        pulse_db::save_credentials(&pool, "token", "777")
            .await
            .expect("save credentials");

        let app = test_app(test_state(pool, &server.uri()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands/7/stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"].as_str(), Some("upstream_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn stats_aggregate_the_upstream_posts(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/analytics/brand-summary/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "1", "network": "instagram",
                      "metrics": { "INTERACTIONS": 10.0, "IMPRESSIONS": 100.0, "ENGAGEMENT": 2.0 } },
                    { "id": "2", "network": "instagram",
                      "metrics": { "INTERACTIONS": 20.0, "IMPRESSIONS": 300.0, "ENGAGEMENT": 4.0 } }
                ]
            })))
            .mount(&server)
            .await;
        seed_brand(&pool, 7, "Acme").await;
        pulse_db::save_credentials(&pool, "token", "777")
            .await
            .expect("save credentials");

        let app = test_app(test_state(pool, &server.uri()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands/7/stats")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["posts"].as_i64(), Some(2));
        assert_eq!(json["data"]["interactions"].as_i64(), Some(30));
        assert_eq!(json["data"]["impressions"].as_i64(), Some(400));
        assert!(
            (json["data"]["avg_engagement_rate"].as_f64().unwrap() - 3.0).abs() < f64::EPSILON
        );
        assert_eq!(json["data"]["posts_by_platform"]["instagram"].as_i64(), Some(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_runs_list_is_empty_on_a_fresh_database(pool: sqlx::PgPool) {
        let app = test_app(test_state(pool, "http://127.0.0.1:9"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync/runs")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
    }
}
