use thiserror::Error;

/// Errors surfaced at a sync job's boundary.
///
/// Per-item failures inside a batch never become a `SyncError`; they are
/// counted (brand sync) or accumulated into an errors list (post sync).
/// A `SyncError` returned from a job means the run as a whole failed and,
/// except for [`SyncError::Configuration`], was recorded on its log row.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials missing or incomplete. Raised before any network call
    /// and before a log row is created.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The external analytics source was unreachable, returned non-2xx,
    /// or produced an unparseable body.
    #[error("upstream error: {0}")]
    Upstream(#[from] pulse_metricool::MetricoolError),

    /// A scoped resync asked for a brand the upstream no longer reports.
    #[error("brand {0} not found in upstream response")]
    BrandNotFound(i64),

    /// A database failure outside the per-row upsert path.
    #[error("database error: {0}")]
    Db(#[from] pulse_db::DbError),
}
