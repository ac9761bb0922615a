//! Glitchless Back binary entrypoint wiring the REST surface, the storage
//! supervisor, and the cleanup scheduler.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glitchless_back::catalog::{CatalogAggregator, CatalogClient};
use glitchless_back::config::AppConfig;
use glitchless_back::dao::race_store::RaceStore;
use glitchless_back::dao::race_store::memory::MemoryRaceStore;
use glitchless_back::error::ServiceError;
use glitchless_back::routes;
use glitchless_back::services::cleanup_service;
use glitchless_back::state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let client = CatalogClient::new(&config.catalog_base_url, config.catalog_timeout)
        .context("building catalog client")?;
    let aggregator = CatalogAggregator::new(client, config.aggregator.clone());

    let app_state = AppState::new(config, aggregator);

    tokio::spawn(run_storage_supervisor(app_state.clone()));
    tokio::spawn(run_cleanup_scheduler(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervises the storage backend by retrying in the background and toggling
/// degraded mode when connectivity changes.
async fn run_storage_supervisor(state: SharedState) {
    let initial_delay_ms = 1000;
    let mut delay = Duration::from_millis(initial_delay_ms);
    let max_delay = Duration::from_secs(10);

    loop {
        if let Some(store) = state.race_store().await {
            match store.health_check().await {
                Ok(()) => {
                    // Healthy backend: reset the retry backoff and avoid
                    // hammering it with probes.
                    delay = Duration::from_millis(initial_delay_ms);
                    state.update_degraded(false).await;
                    sleep(Duration::from_secs(5)).await;
                }
                Err(err) => {
                    warn!(error = %err, "storage probe failed; attempting reconnect");
                    if store.try_reconnect().await.is_ok() {
                        info!("storage reconnected");
                        state.update_degraded(false).await;
                    } else {
                        // Reconnect failed: drop the backend, flip to degraded
                        // mode, and retry with exponential backoff.
                        warn!("storage reconnect failed; entering degraded mode");
                        state.clear_race_store().await;
                        sleep(delay).await;
                        delay = (delay * 2).min(max_delay);
                    }
                }
            }
            continue;
        }

        match build_store().await {
            Ok(store) => {
                info!("storage backend ready; leaving degraded mode");
                state.set_race_store(store).await;
                delay = Duration::from_millis(initial_delay_ms);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
        }
    }
}

/// Build the configured storage backend: PostgreSQL when `DATABASE_URL` is
/// set, the in-memory store otherwise.
async fn build_store() -> anyhow::Result<Arc<dyn RaceStore>> {
    #[cfg(feature = "postgres-store")]
    if env::var_os("DATABASE_URL").is_some() {
        use glitchless_back::dao::race_store::postgres::{PgConfig, PgRaceStore};

        let config = PgConfig::from_env().context("reading PostgreSQL configuration")?;
        let store = PgRaceStore::connect(config)
            .await
            .context("connecting to PostgreSQL")?;
        return Ok(Arc::new(store));
    }

    info!("DATABASE_URL not set; using the in-memory store");
    Ok(Arc::new(MemoryRaceStore::new()))
}

/// Periodically attempt a cleanup sweep of stale finished races.
async fn run_cleanup_scheduler(state: SharedState) {
    let tick = state.config().cleanup_tick;
    loop {
        sleep(tick).await;
        match cleanup_service::sweep(&state, false).await {
            Ok(outcome) if outcome.ran => {
                debug!(deleted = outcome.deleted, "scheduled cleanup sweep done");
            }
            Ok(_) => {}
            Err(ServiceError::Degraded) => {
                debug!("skipping cleanup sweep while degraded");
            }
            Err(err) => {
                warn!(error = %err, "scheduled cleanup sweep failed");
            }
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
