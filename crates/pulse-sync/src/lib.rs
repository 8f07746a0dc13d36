//! The synchronization pipeline: pulls brand and post data from the
//! external analytics source, normalizes it, and upserts it into the
//! registry tables, with one append-only log row per run.
//!
//! Three entry points:
//! - [`run_brand_sync`] — full-replace diff of the brand registry.
//! - [`run_post_sync`] — per-brand post ingestion with best-effort
//!   platform-detail enrichment.
//! - [`run_schedule_tick`] — drives the automatic-sync schedule.
//!
//! All jobs are stateless request/response invocations. Credentials are
//! loaded once per invocation and threaded through as a constructed
//! client, never held as ambient state. Correctness under overlapping
//! invocations relies on the storage layer's upsert-on-conflict keys.

mod brand;
mod error;
mod normalize;
mod posts;
mod schedule;

pub use brand::{run_brand_sync, BrandScope, BrandSyncOutcome, TriggerSource};
pub use error::SyncError;
pub use posts::{run_post_sync, BrandPostOutcome, PostSyncReport};
pub use schedule::{run_schedule_tick, TickOutcome};

/// Connection settings for the external analytics source, minus the
/// credential pair (which lives in the database and is loaded per run).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl SyncConfig {
    #[must_use]
    pub fn from_app_config(config: &pulse_core::AppConfig) -> Self {
        Self {
            base_url: config.metricool_base_url.clone(),
            timeout_secs: config.metricool_timeout_secs,
        }
    }
}

/// How many days a soft-deleted brand is retained before the sweep
/// hard-deletes it.
pub const RETENTION_DAYS: i32 = 31;

/// The trailing window, in days, posts are synced over.
pub const POST_WINDOW_DAYS: i64 = 30;

pub(crate) async fn build_client(
    pool: &sqlx::PgPool,
    config: &SyncConfig,
) -> Result<pulse_metricool::MetricoolClient, SyncError> {
    let creds = pulse_db::get_credentials(pool)
        .await?
        .ok_or_else(|| SyncError::Configuration("credentials are not configured".to_string()))?;

    if creds.access_token.trim().is_empty() || creds.account_id.trim().is_empty() {
        return Err(SyncError::Configuration(
            "credentials are incomplete: access token and account id are both required"
                .to_string(),
        ));
    }

    let client = pulse_metricool::MetricoolClient::with_base_url(
        &creds.access_token,
        &creds.account_id,
        config.timeout_secs,
        &config.base_url,
    )?;

    Ok(client)
}
