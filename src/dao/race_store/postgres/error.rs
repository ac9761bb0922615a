//! Error types shared by the PostgreSQL storage implementation.

use thiserror::Error;

use crate::dao::storage::StorageError;
use crate::races::status::UnknownStatus;

/// Convenient result alias returning [`PgDaoError`] failures.
pub type PgResult<T> = Result<T, PgDaoError>;

/// Failures that can occur while interacting with PostgreSQL.
#[derive(Debug, Error)]
pub enum PgDaoError {
    /// Required environment variable is missing.
    #[error("missing PostgreSQL environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// Establishing the connection pool failed.
    #[error("failed to connect to PostgreSQL")]
    Connect {
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },
    /// Creating the schema on startup failed.
    #[error("failed to ensure PostgreSQL schema")]
    Schema {
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },
    /// A statement failed to execute.
    #[error("PostgreSQL query failed during {context}")]
    Query {
        /// Operation that was running.
        context: &'static str,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },
    /// A persisted status literal could not be interpreted.
    #[error("corrupt status literal in row")]
    CorruptStatus {
        /// The rejected literal.
        #[source]
        source: UnknownStatus,
    },
}

impl From<PgDaoError> for StorageError {
    fn from(err: PgDaoError) -> Self {
        match err {
            PgDaoError::CorruptStatus { source } => StorageError::corrupt(source.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
