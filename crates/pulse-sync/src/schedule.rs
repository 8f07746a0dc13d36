//! The schedule controller: decides on each tick whether an automatic
//! brand sync is due and advances the schedule after running one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::{run_brand_sync, BrandScope, BrandSyncOutcome, SyncConfig, SyncError, TriggerSource};

/// What a schedule tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// No schedule row, or automatic sync is disabled.
    Disabled,
    /// Enabled but the next run time has not arrived.
    NotDue { next_run_at: DateTime<Utc> },
    /// A sync was due and was attempted. The schedule advances whether the
    /// sync succeeded or not, so a persistently failing upstream cannot
    /// make the tick fire continuously.
    Ran {
        outcome: Result<BrandSyncOutcome, String>,
        next_run_at: Option<DateTime<Utc>>,
    },
}

/// Runs one schedule tick. Safe to call as often as the host likes; a
/// tick that finds nothing due does nothing.
///
/// An enabled schedule with a null `next_run_at` (freshly enabled rows
/// always have one, but operators can poke the table) counts as due.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if the schedule cannot be read. Failures of
/// the sync itself are reported inside [`TickOutcome::Ran`], not as an
/// error.
pub async fn run_schedule_tick(
    pool: &PgPool,
    config: &SyncConfig,
) -> Result<TickOutcome, SyncError> {
    let Some(schedule) = pulse_db::get_schedule(pool).await? else {
        debug!("no schedule configured, tick is a no-op");
        return Ok(TickOutcome::Disabled);
    };
    if !schedule.enabled {
        debug!("automatic sync disabled, tick is a no-op");
        return Ok(TickOutcome::Disabled);
    }

    if let Some(next_run_at) = schedule.next_run_at {
        if next_run_at > Utc::now() {
            debug!(%next_run_at, "automatic sync not yet due");
            return Ok(TickOutcome::NotDue { next_run_at });
        }
    }

    info!(interval_hours = schedule.interval_hours, "automatic sync due, running brand sync");
    let outcome = run_brand_sync(pool, config, TriggerSource::Auto, BrandScope::All)
        .await
        .map_err(|e| e.to_string());

    if let Err(message) = &outcome {
        warn!(error = %message, "scheduled brand sync failed");
    }

    // Advance regardless of the sync result.
    let next_run_at = match pulse_db::mark_schedule_ran(pool).await {
        Ok(row) => row.next_run_at,
        Err(e) => {
            warn!(error = %e, "could not advance the sync schedule");
            None
        }
    };

    Ok(TickOutcome::Ran {
        outcome,
        next_run_at,
    })
}
