//! Command validation error types.

use applink_core::error::LifecycleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("required field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("field '{field}' must be positive")]
    NonPositive { field: &'static str },

    #[error("{message}")]
    InvalidDomain { message: String },
}

impl From<CommandError> for LifecycleError {
    fn from(err: CommandError) -> Self {
        LifecycleError::Validation {
            message: err.to_string(),
        }
    }
}
