use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token auth settings, taken from [`pulse_core::AppConfig::api_keys`].
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth settings from the configured key list.
    ///
    /// An empty list disables auth, which is only allowed in development;
    /// elsewhere it is a startup error.
    ///
    /// # Errors
    ///
    /// Fails when `api_keys` is empty and `is_development` is false.
    pub fn new(api_keys: &[String], is_development: bool) -> anyhow::Result<Self> {
        if api_keys.is_empty() {
            anyhow::ensure!(
                is_development,
                "PULSE_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
            tracing::warn!("no API keys configured; bearer auth disabled for development");
            return Ok(Self {
                api_keys: Arc::new(HashSet::new()),
                enabled: false,
            });
        }

        Ok(Self {
            api_keys: Arc::new(api_keys.iter().cloned().collect()),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

/// Fixed-window request limiter shared across all clients.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: u32,
    window: Duration,
    counter: Arc<Mutex<WindowCounter>>,
}

#[derive(Debug)]
struct WindowCounter {
    opened_at: Instant,
    used: u32,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counter: Arc::new(Mutex::new(WindowCounter {
                opened_at: Instant::now(),
                used: 0,
            })),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &pulse_core::AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Counts one request against the current window. Returns false once
    /// the window's budget is spent.
    async fn try_acquire(&self) -> bool {
        let mut counter = self.counter.lock().await;
        if counter.opened_at.elapsed() >= self.window {
            counter.opened_at = Instant::now();
            counter.used = 0;
        }

        if counter.used >= self.max_requests {
            return false;
        }

        counter.used += 1;
        true
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// An incoming `x-request-id` header wins; otherwise a fresh `UUIDv4` is
/// minted. The ID lands in request extensions as [`RequestId`] and is
/// echoed back on the response header.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing bearer-token auth when enabled.
///
/// Rejections use the standard error envelope so API consumers see the
/// same `{error, meta}` shape as handler failures.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = extract_bearer_token(req.headers().get(AUTHORIZATION));
    match token {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => reject(&req, "unauthorized", "missing or invalid bearer token"),
    }
}

/// Middleware counting each request against the shared rate-limit window.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if rate_limit.try_acquire().await {
        next.run(req).await
    } else {
        reject(&req, "rate_limited", "rate limit exceeded")
    }
}

fn reject(req: &Request, code: &'static str, message: &'static str) -> Response {
    // The request-id layer wraps this one, so the extension is always set.
    let id = req
        .extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |rid| rid.0.clone());
    ApiError::new(id, code, message).into_response()
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
