//! Error types for the AppLink system.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed or missing input, rejected before any handler logic runs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// An entity method was invoked from a state that does not permit it.
    /// Raised before mutation — the entity is left untouched.
    #[error("invalid state transition: {entity} {id} cannot {operation} while {from}")]
    InvalidStateTransition {
        entity: &'static str,
        id: Uuid,
        from: &'static str,
        operation: &'static str,
    },

    /// The provided application token does not match the stored one.
    /// Both tokens are included for diagnosability.
    #[error("application token mismatch on {entity} {id}: stored '{stored}', provided '{provided}'")]
    TokenMismatch {
        entity: &'static str,
        id: Uuid,
        stored: String,
        provided: String,
    },

    /// A renewed credential belongs to a different member than the account.
    #[error("member mismatch on account {account_id}: expected '{expected}', provided '{provided}'")]
    MemberMismatch {
        account_id: Uuid,
        expected: String,
        provided: String,
    },

    /// Application versions only move forward.
    #[error(
        "version downgrade on account {account_id}: current {current}, attempted {attempted}"
    )]
    VersionDowngrade {
        account_id: Uuid,
        current: u32,
        attempted: u32,
    },

    /// No entity matched a required lookup.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// More than one account matched a uniqueness assumption.
    #[error("multiple accounts found for member '{member_id}': {count}")]
    MultipleAccountsFound { member_id: String, count: usize },

    /// More than one live installation matched a uniqueness assumption.
    #[error("multiple installations found for member '{member_id}': {count}")]
    MultipleInstallationsFound { member_id: String, count: usize },

    /// Persistence collaborator failure.
    #[error("database error: {0}")]
    Database(String),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
