//! Database-specific error types and conversions.

use applink_core::error::LifecycleError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt {entity} row: {reason}")]
    Decode {
        entity: &'static str,
        reason: String,
    },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },
}

impl From<DbError> for LifecycleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LifecycleError::NotFound { entity, key: id },
            other => LifecycleError::Database(other.to_string()),
        }
    }
}
