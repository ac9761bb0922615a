//! Health probing: storage reachability feeds the degraded flag.

use crate::state::SharedState;

/// Probe the storage backend, refresh the degraded flag, and report it.
/// The flag is the single source of truth for what the health endpoint
/// returns.
pub async fn probe_storage(state: &SharedState) -> bool {
    let up = match state.race_store().await {
        Some(store) => store.health_check().await.is_ok(),
        None => false,
    };
    state.update_degraded(!up).await;
    !state.is_degraded().await
}
