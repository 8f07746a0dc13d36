//! The post sync job: per-brand post ingestion over a trailing window,
//! with best-effort platform-detail enrichment.

use std::collections::HashMap;

use pulse_db::{BrandRow, NewContentSyncLog};
use pulse_metricool::{DateWindow, MetricoolClient, Platform};
use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{build_client, normalize, SyncConfig, SyncError, POST_WINDOW_DAYS};

const FALLBACK_TIMEZONE: &str = "UTC";

/// Per-brand counters and accumulated per-item errors from a post sync.
#[derive(Debug, Clone)]
pub struct BrandPostOutcome {
    pub brand_id: i64,
    pub fetched: usize,
    pub stored: usize,
    pub errors: Vec<String>,
}

/// The aggregate result of one post sync invocation.
#[derive(Debug, Clone)]
pub struct PostSyncReport {
    pub brands: Vec<BrandPostOutcome>,
    pub total_fetched: usize,
    pub total_stored: usize,
    /// Id of the `content_sync_logs` row, when the log write succeeded.
    pub log_id: Option<i64>,
}

/// Runs one post sync over the trailing window, covering every active
/// brand or a single one.
///
/// Per brand: fetch the base post list, fetch the four platform detail
/// feeds concurrently, join detail records onto posts by the platform's
/// natural key, and upsert. A failed or empty detail fetch degrades to
/// no enrichment; a failed base fetch or post upsert lands in that
/// brand's errors list. One `content_sync_logs` row is written per
/// invocation.
///
/// # Errors
///
/// - [`SyncError::Configuration`] if credentials are missing or incomplete.
/// - [`SyncError::Db`] if the brand lookup fails — including
///   [`DbError::NotFound`](pulse_db::DbError::NotFound) for a scoped run
///   naming an unknown or soft-deleted brand.
pub async fn run_post_sync(
    pool: &PgPool,
    config: &SyncConfig,
    brand_id: Option<i64>,
) -> Result<PostSyncReport, SyncError> {
    let client = build_client(pool, config).await?;

    // Both scopes cover active brands only; a soft-deleted id is NotFound.
    let brands = match brand_id {
        Some(id) => vec![pulse_db::get_active_brand(pool, id).await?],
        None => pulse_db::list_active_brands(pool).await?,
    };

    let window = DateWindow::trailing_days(POST_WINDOW_DAYS);

    let mut outcomes = Vec::with_capacity(brands.len());
    for brand in &brands {
        outcomes.push(sync_brand_posts(pool, &client, brand, &window).await);
    }

    let total_fetched: usize = outcomes.iter().map(|o| o.fetched).sum();
    let total_stored: usize = outcomes.iter().map(|o| o.stored).sum();
    let all_errors: Vec<String> = outcomes
        .iter()
        .flat_map(|o| {
            o.errors
                .iter()
                .map(move |e| format!("brand {}: {e}", o.brand_id))
        })
        .collect();

    let log = NewContentSyncLog {
        brand_id,
        platform: "all".to_string(),
        posts_fetched: i32::try_from(total_fetched).unwrap_or(i32::MAX),
        errors: (!all_errors.is_empty()).then(|| json!(all_errors)),
        raw_response: json!({
            "window": { "from": window.from_param(), "to": window.to_param() },
            "brands": outcomes
                .iter()
                .map(|o| json!({
                    "brandId": o.brand_id,
                    "fetched": o.fetched,
                    "stored": o.stored,
                    "errors": o.errors.len(),
                }))
                .collect::<Vec<_>>(),
        }),
    };
    let log_id = match pulse_db::insert_content_sync_log(pool, &log).await {
        Ok(row) => Some(row.id),
        Err(e) => {
            warn!(error = %e, "could not write content sync log");
            None
        }
    };

    info!(
        brands = outcomes.len(),
        total_fetched,
        total_stored,
        errors = all_errors.len(),
        "post sync complete"
    );

    Ok(PostSyncReport {
        brands: outcomes,
        total_fetched,
        total_stored,
        log_id,
    })
}

async fn sync_brand_posts(
    pool: &PgPool,
    client: &MetricoolClient,
    brand: &BrandRow,
    window: &DateWindow,
) -> BrandPostOutcome {
    let mut outcome = BrandPostOutcome {
        brand_id: brand.id,
        fetched: 0,
        stored: 0,
        errors: Vec::new(),
    };
    let timezone = brand.timezone.as_deref().unwrap_or(FALLBACK_TIMEZONE);

    let posts = match client.list_posts(brand.id, window, timezone).await {
        Ok(posts) => posts,
        Err(e) => {
            outcome.errors.push(format!("post list fetch failed: {e}"));
            return outcome;
        }
    };
    outcome.fetched = posts.len();

    // No base posts in the window: nothing to enrich, so the detail
    // endpoints are not called at all.
    if posts.is_empty() {
        return outcome;
    }

    let (facebook, instagram, tiktok, linkedin) = tokio::join!(
        client.facebook_reels(brand.id, window, timezone),
        client.instagram_reels(brand.id, window, timezone),
        client.tiktok_posts(brand.id, window, timezone),
        client.linkedin_posts(brand.id, window, timezone),
    );

    let mut details: HashMap<Platform, HashMap<String, Value>> = HashMap::new();
    details.insert(
        Platform::Facebook,
        normalize::detail_index(detail_or_empty(facebook, brand.id, Platform::Facebook), Platform::Facebook),
    );
    details.insert(
        Platform::Instagram,
        normalize::detail_index(detail_or_empty(instagram, brand.id, Platform::Instagram), Platform::Instagram),
    );
    details.insert(
        Platform::Tiktok,
        normalize::detail_index(detail_or_empty(tiktok, brand.id, Platform::Tiktok), Platform::Tiktok),
    );
    details.insert(
        Platform::Linkedin,
        normalize::detail_index(detail_or_empty(linkedin, brand.id, Platform::Linkedin), Platform::Linkedin),
    );

    for post in &posts {
        let detail = post
            .network
            .as_deref()
            .and_then(Platform::from_network)
            .and_then(|platform| details.get(&platform))
            .and_then(|index| index.get(&post.id));

        let new_post = normalize::post_from_summary(post, brand.id, detail);
        match pulse_db::upsert_post(pool, &new_post).await {
            Ok(()) => outcome.stored += 1,
            Err(e) => outcome.errors.push(format!("post {}: {e}", post.id)),
        }
    }

    outcome
}

/// A failed detail fetch never fails the brand; enrichment just does not
/// happen for that platform this run.
fn detail_or_empty(
    result: Result<Vec<Value>, pulse_metricool::MetricoolError>,
    brand_id: i64,
    platform: Platform,
) -> Vec<Value> {
    match result {
        Ok(records) => records,
        Err(e) => {
            warn!(
                brand_id,
                platform = platform.as_str(),
                error = %e,
                "detail fetch failed, continuing without enrichment"
            );
            Vec::new()
        }
    }
}
