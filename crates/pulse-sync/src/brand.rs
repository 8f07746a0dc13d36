//! The brand sync job: full-replace diff of the brand registry against
//! the upstream profile list.

use std::collections::HashSet;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{build_client, normalize, SyncConfig, SyncError, RETENTION_DAYS};

/// What triggered a sync run. Recorded verbatim on the `sync_runs` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Manual,
    Auto,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

/// Which brands a sync run covers.
///
/// A scoped run (`One`) refreshes a single brand and never marks absences:
/// filtering the fetched list to one brand would otherwise read every other
/// brand as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandScope {
    All,
    One(i64),
}

/// Counters from a completed brand sync, mirroring the `sync_runs` row.
#[derive(Debug, Clone, Copy)]
pub struct BrandSyncOutcome {
    /// Internal id of the `sync_runs` row recording this run.
    pub run_id: i64,
    pub total_fetched: usize,
    pub created: i32,
    pub updated: i32,
    pub marked_deleted: i32,
    /// Brands fetched but not stored because their individual upsert failed.
    pub skipped: i32,
}

/// Runs one brand sync: fetch the upstream profile list, upsert every
/// profile, soft-delete registry brands absent from the fetch (full scope
/// only), and sweep soft-deleted rows past the retention window.
///
/// Creates a `sync_runs` row up front and completes or fails it before
/// returning. Per-brand upsert failures are counted and skipped, not
/// fatal.
///
/// # Errors
///
/// - [`SyncError::Configuration`] if credentials are missing or incomplete
///   (no run row is created).
/// - [`SyncError::Upstream`] if the profile fetch fails; the run row is
///   marked failed with the error message.
/// - [`SyncError::BrandNotFound`] if a scoped run's brand is absent from
///   the fetched list; the run row is marked failed.
/// - [`SyncError::Db`] on database failures outside the per-brand upserts.
pub async fn run_brand_sync(
    pool: &PgPool,
    config: &SyncConfig,
    source: TriggerSource,
    scope: BrandScope,
) -> Result<BrandSyncOutcome, SyncError> {
    let client = build_client(pool, config).await?;

    let run = pulse_db::create_sync_run(pool, source.as_str()).await?;

    let records = match client.list_brand_profiles().await {
        Ok(records) => records,
        Err(e) => {
            fail_run(pool, run.id, &e.to_string()).await;
            return Err(e.into());
        }
    };
    let total_fetched = records.len();

    let records = match scope {
        BrandScope::All => records,
        BrandScope::One(id) => {
            let scoped: Vec<_> = records
                .into_iter()
                .filter(|r| r.profile.id == id)
                .collect();
            if scoped.is_empty() {
                let err = SyncError::BrandNotFound(id);
                fail_run(pool, run.id, &err.to_string()).await;
                return Err(err);
            }
            scoped
        }
    };

    let states = pulse_db::list_brand_states(pool).await?;
    let known: HashSet<i64> = states.iter().map(|s| s.id).collect();
    let active = states.iter().filter(|s| s.deleted_at.is_none()).count();

    let mut created = 0_i32;
    let mut updated = 0_i32;
    let mut skipped = 0_i32;
    let mut seen_ids = Vec::with_capacity(records.len());

    for record in &records {
        let brand = normalize::brand_from_profile(record);
        // Present upstream, so never a deletion candidate — even if its
        // own upsert fails below.
        seen_ids.push(brand.id);

        match pulse_db::upsert_brand(pool, &brand).await {
            Ok(()) => {
                if known.contains(&brand.id) {
                    updated += 1;
                } else {
                    created += 1;
                }
            }
            Err(e) => {
                warn!(brand_id = brand.id, error = %e, "brand upsert failed, skipping");
                skipped += 1;
            }
        }
    }

    let marked_deleted = match scope {
        BrandScope::One(_) => 0,
        BrandScope::All if records.is_empty() && active > 0 => {
            // A successful fetch of zero brands while the registry has
            // active rows is far more likely an upstream hiccup than a
            // mass offboarding. Refuse to mark anything.
            warn!(
                active_brands = active,
                "upstream returned an empty brand list, skipping the deletion pass"
            );
            0
        }
        BrandScope::All => {
            let marked = pulse_db::mark_missing_brands_deleted(pool, &seen_ids).await?;
            i32::try_from(marked).unwrap_or(i32::MAX)
        }
    };

    // Retention sweep. Best-effort: a failed purge is retried implicitly
    // on the next run and never fails this one.
    match pulse_db::purge_soft_deleted(pool, RETENTION_DAYS).await {
        Ok(0) => {}
        Ok(purged) => info!(purged, "purged brands past the retention window"),
        Err(e) => warn!(error = %e, "retention purge failed"),
    }

    pulse_db::complete_sync_run(pool, run.id, created, updated, marked_deleted).await?;

    info!(
        run_id = run.id,
        source = source.as_str(),
        total_fetched,
        created,
        updated,
        marked_deleted,
        skipped,
        "brand sync complete"
    );

    Ok(BrandSyncOutcome {
        run_id: run.id,
        total_fetched,
        created,
        updated,
        marked_deleted,
        skipped,
    })
}

/// Marks the run row failed. Failures here are logged, not propagated —
/// the original error is the one worth surfacing.
async fn fail_run(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(e) = pulse_db::fail_sync_run(pool, run_id, message).await {
        warn!(run_id, error = %e, "could not mark sync run as failed");
    }
}
