//! Remote catalog integration: typed client for the public speedrun.com
//! games API, payload normalization, ranking stages, and the multi-variant
//! aggregator.

pub mod aggregator;
pub mod client;
pub mod models;
pub mod ranking;

pub use aggregator::{AggregatorSettings, CatalogAggregator};
pub use client::{CatalogClient, CatalogError};
pub use models::RemoteGame;
