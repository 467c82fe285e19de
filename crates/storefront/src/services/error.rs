//! Service error types.

use serde::Serialize;
use thiserror::Error;

use super::otp::OtpError;
use crate::db::RepositoryError;

/// A rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur in the engagement services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more inputs were malformed or missing.
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    /// Unknown store, item or customer.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing or invalid credential for the requested action.
    #[error("unauthorized")]
    Unauthorized,

    /// A uniqueness rule was violated.
    #[error("{field} {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },

    /// OTP verification failed.
    #[error(transparent)]
    Otp(#[from] OtpError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}
