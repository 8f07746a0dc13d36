//! Background scheduler driving the automatic sync schedule.
//!
//! Registers a single recurring tick that asks the schedule controller
//! whether an automatic brand sync is due. All of the actual decision
//! logic lives in `pulse_sync::run_schedule_tick`; this module only hosts
//! the timer.

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pulse_sync::{SyncConfig, TickOutcome};

/// The tick cadence. The schedule itself is stored in the database with
/// 12h/24h granularity; a five-minute tick keeps the worst-case firing
/// delay small without hammering anything.
const TICK_SCHEDULE: &str = "0 */5 * * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the tick job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    sync_config: SyncConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(TICK_SCHEDULE, move |_uuid, _lock| {
        let pool = pool.clone();
        let sync_config = sync_config.clone();

        Box::pin(async move {
            run_tick(&pool, &sync_config).await;
        })
    })?;
    scheduler.add(job).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn run_tick(pool: &PgPool, sync_config: &SyncConfig) {
    match pulse_sync::run_schedule_tick(pool, sync_config).await {
        Ok(TickOutcome::Disabled) => {}
        Ok(TickOutcome::NotDue { next_run_at }) => {
            tracing::debug!(%next_run_at, "scheduler: automatic sync not due");
        }
        Ok(TickOutcome::Ran { outcome, next_run_at }) => match outcome {
            Ok(sync) => tracing::info!(
                run_id = sync.run_id,
                created = sync.created,
                updated = sync.updated,
                marked_deleted = sync.marked_deleted,
                ?next_run_at,
                "scheduler: automatic brand sync complete"
            ),
            Err(message) => tracing::error!(
                error = %message,
                ?next_run_at,
                "scheduler: automatic brand sync failed"
            ),
        },
        Err(e) => {
            tracing::error!(error = %e, "scheduler: tick failed");
        }
    }
}
