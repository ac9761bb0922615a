//! Application-level configuration loading: cleanup sweep tuning and
//! remote catalog settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::AggregatorSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GLITCHLESS_BACK_CONFIG_PATH";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Remote catalog base URL (no trailing slash required).
    pub catalog_base_url: String,
    /// Per-request timeout for outbound catalog calls.
    pub catalog_timeout: Duration,
    /// Aggregator tuning knobs.
    pub aggregator: AggregatorSettings,
    /// How long a finished race survives before the sweep may delete it.
    pub cleanup_retention: Duration,
    /// Minimum pause between two sweep executions.
    pub cleanup_min_interval: Duration,
    /// Period of the scheduler that triggers sweep attempts.
    pub cleanup_tick: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// built-in defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    catalog: RawCatalogConfig,
    cleanup: RawCleanupConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCatalogConfig {
    base_url: String,
    request_timeout_ms: u64,
    page_size: u32,
    request_delay_ms: u64,
    search_budget: usize,
    exhaustive_budget: usize,
}

impl Default for RawCatalogConfig {
    fn default() -> Self {
        let defaults = AggregatorSettings::default();
        Self {
            base_url: "https://www.speedrun.com/api/v1".to_string(),
            request_timeout_ms: 10_000,
            page_size: defaults.page_size,
            request_delay_ms: defaults.request_delay.as_millis() as u64,
            search_budget: defaults.search_budget,
            exhaustive_budget: defaults.exhaustive_budget,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCleanupConfig {
    retention_secs: u64,
    min_interval_secs: u64,
    tick_secs: u64,
}

impl Default for RawCleanupConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3_600,
            min_interval_secs: 900,
            tick_secs: 300,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            catalog_base_url: raw.catalog.base_url,
            catalog_timeout: Duration::from_millis(raw.catalog.request_timeout_ms),
            aggregator: AggregatorSettings {
                page_size: raw.catalog.page_size.clamp(1, 200),
                request_delay: Duration::from_millis(raw.catalog.request_delay_ms),
                search_budget: raw.catalog.search_budget,
                exhaustive_budget: raw.catalog.exhaustive_budget,
            },
            cleanup_retention: Duration::from_secs(raw.cleanup.retention_secs),
            cleanup_min_interval: Duration::from_secs(raw.cleanup.min_interval_secs),
            cleanup_tick: Duration::from_secs(raw.cleanup.tick_secs),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
