//! Central application state shared across request handlers and
//! background tasks.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock, watch};

use crate::catalog::CatalogAggregator;
use crate::config::AppConfig;
use crate::dao::race_store::RaceStore;
use crate::error::ServiceError;

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the race store handle, the catalog
/// aggregator, and the cleanup sweep ledger.
pub struct AppState {
    race_store: RwLock<Option<Arc<dyn RaceStore>>>,
    aggregator: CatalogAggregator,
    config: AppConfig,
    degraded: watch::Sender<bool>,
    last_sweep: Mutex<Option<Instant>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed by the storage supervisor.
    pub fn new(config: AppConfig, aggregator: CatalogAggregator) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            race_store: RwLock::new(None),
            aggregator,
            config,
            degraded: degraded_tx,
            last_sweep: Mutex::new(None),
        })
    }

    /// Obtain a handle to the current race store, if one is installed.
    pub async fn race_store(&self) -> Option<Arc<dyn RaceStore>> {
        let guard = self.race_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the race store or fail with the degraded-mode error.
    pub async fn require_race_store(&self) -> Result<Arc<dyn RaceStore>, ServiceError> {
        self.race_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn set_race_store(&self, store: Arc<dyn RaceStore>) {
        {
            let mut guard = self.race_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current storage backend and enter degraded mode.
    pub async fn clear_race_store(&self) {
        {
            let mut guard = self.race_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag, the value the health endpoint reports.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// The shared catalog aggregator.
    pub fn aggregator(&self) -> &CatalogAggregator {
        &self.aggregator
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Ledger of the last cleanup sweep execution, used for throttling.
    pub fn last_sweep(&self) -> &Mutex<Option<Instant>> {
        &self.last_sweep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogAggregator, CatalogClient};
    use crate::dao::race_store::memory::MemoryRaceStore;

    fn state() -> SharedState {
        let config = AppConfig::default();
        let client =
            CatalogClient::new(&config.catalog_base_url, config.catalog_timeout).expect("client");
        let aggregator = CatalogAggregator::new(client, config.aggregator.clone());
        AppState::new(config, aggregator)
    }

    #[tokio::test]
    async fn degraded_flag_follows_the_store_slot() {
        let state = state();
        assert!(state.is_degraded().await);
        assert!(state.race_store().await.is_none());

        state
            .set_race_store(Arc::new(MemoryRaceStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(state.race_store().await.is_some());

        state.clear_race_store().await;
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_race_store().await,
            Err(ServiceError::Degraded)
        ));
    }
}
