//! Deferred deletion of finished races.
//!
//! Finished races stay visible for a retention window so latecomers can
//! read the results, then a sweep deletes them. Sweeps are throttled to a
//! minimum interval; the HTTP trigger may bypass the throttle with `force`.

use std::time::Instant;

use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::ServiceError;
use crate::state::SharedState;

/// Result of one sweep attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Whether the sweep actually ran (false when throttled).
    pub ran: bool,
    /// Number of stale races deleted.
    pub deleted: u64,
}

/// Run a cleanup sweep, deleting finished races whose last update is older
/// than the retention window. Returns without touching storage when the
/// previous sweep was too recent, unless `force` is set.
pub async fn sweep(state: &SharedState, force: bool) -> Result<SweepOutcome, ServiceError> {
    let store = state.require_race_store().await?;
    let config = state.config();

    // The guard is held for the whole sweep so two triggers cannot race.
    let mut last_sweep = state.last_sweep().lock().await;
    if !force
        && let Some(previous) = *last_sweep
        && previous.elapsed() < config.cleanup_min_interval
    {
        debug!("cleanup sweep throttled");
        return Ok(SweepOutcome {
            ran: false,
            deleted: 0,
        });
    }

    let cutoff = OffsetDateTime::now_utc() - config.cleanup_retention;
    let stale = store.count_stale_finished(cutoff).await?;
    let deleted = if stale == 0 {
        0
    } else {
        store.delete_stale_finished(cutoff).await?
    };
    *last_sweep = Some(Instant::now());

    if deleted > 0 {
        info!(deleted, "cleanup sweep removed stale races");
    } else {
        debug!("cleanup sweep found nothing to remove");
    }
    Ok(SweepOutcome { ran: true, deleted })
}
