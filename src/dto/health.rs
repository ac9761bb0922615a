//! Health endpoint payload.

use serde::Serialize;
use utoipa::ToSchema;

/// Health status of the service.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status, `ok` or `degraded`.
    pub status: &'static str,
    /// Whether the storage backend is reachable.
    pub storage: bool,
}

impl HealthResponse {
    /// Build the payload from the storage reachability flag.
    pub fn from_storage(storage_up: bool) -> Self {
        Self {
            status: if storage_up { "ok" } else { "degraded" },
            storage: storage_up,
        }
    }
}
