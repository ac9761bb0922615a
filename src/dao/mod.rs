//! Persistence layer: shared entity models, the backend-agnostic error
//! type, and the `RaceStore` trait with its backends.

pub mod models;
pub mod race_store;
pub mod storage;
