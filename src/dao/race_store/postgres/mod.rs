//! PostgreSQL implementation of the race store.

mod config;
mod error;
mod store;

pub use config::PgConfig;
pub use error::{PgDaoError, PgResult};
pub use store::PgRaceStore;
