//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Error bodies are JSON: `{ "error": "...", "fields": [...] }`. Field lists
//! accompany validation and conflict errors only; not-found and unauthorized
//! responses carry a generic message so they reveal nothing about what exists.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{FieldError, OtpError, ServiceError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Engagement service failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated for this resource.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        Self::Service(err.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Service(ServiceError::Repository(_))
        )
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service(err) => match err {
                ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Unauthorized | ServiceError::Otp(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Conflict { .. } => StatusCode::CONFLICT,
                ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    // Don't expose internal error details to clients
    fn body(self) -> ErrorBody {
        let (error, fields) = match self {
            Self::Database(_) | Self::Internal(_) => {
                ("Internal server error".to_string(), Vec::new())
            }
            Self::Service(err) => match err {
                ServiceError::Validation(fields) => ("Validation failed".to_string(), fields),
                ServiceError::NotFound(_) => ("Not found".to_string(), Vec::new()),
                ServiceError::Unauthorized => ("Unauthorized".to_string(), Vec::new()),
                ServiceError::Otp(e) => (e.to_string(), Vec::new()),
                ServiceError::Conflict { field, message } => (
                    format!("{field} {message}"),
                    vec![FieldError::new(field, message)],
                ),
                ServiceError::Repository(_) => ("Internal server error".to_string(), Vec::new()),
            },
            Self::NotFound(_) => ("Not found".to_string(), Vec::new()),
            Self::Unauthorized(_) => ("Unauthorized".to_string(), Vec::new()),
            Self::BadRequest(message) => (message, Vec::new()),
        };
        ErrorBody { error, fields }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context to a verified customer.
///
/// Call this after successful verification to associate errors with the
/// customer. Only the id is attached.
pub fn set_sentry_user(customer_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the customer.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
