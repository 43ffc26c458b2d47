//! Unified error handling for the HTTP boundary.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::account_actor::AccountError;
use crate::actors::SettingsError;

/// Every failure a directory request can end in.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or a value is out of range.
    #[error("{0}")]
    Validation(String),

    /// The request itself could not be understood.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Stale revision on an update.
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Caller origin is not in the allow list.
    #[error("Origin not allowed: {0}")]
    Forbidden(String),

    /// A store did not answer within the request deadline.
    #[error("The directory did not respond within {0:?}; please retry")]
    Timeout(Duration),

    /// A store is not running.
    #[error("The directory is temporarily unavailable; please retry")]
    Unavailable(String),

    /// Snapshot persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error kind as reported in the `error` field of the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::BadRequest(_) => "BadRequest",
            Self::NotFound(_) => "NotFoundError",
            Self::Conflict(_) => "ConflictError",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::Forbidden(_) => "Forbidden",
            Self::Timeout(_) | Self::Unavailable(_) => "TransientNetworkError",
            Self::Storage(_) => "StorageError",
            Self::Internal(_) => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Directory request failed");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "Directory request rejected");
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Storage(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = json!({
            "ok": false,
            "error": self.kind(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(msg) => Self::Validation(msg),
            e @ AccountError::NotFound(_) => Self::NotFound(e.to_string()),
            e @ (AccountError::Conflict { .. } | AccountError::KeyReused(_)) => Self::Conflict(e.to_string()),
            AccountError::InvalidCredentials => Self::InvalidCredentials,
            AccountError::Storage(msg) => Self::Storage(msg),
            AccountError::Credential(msg) => Self::Internal(msg),
            AccountError::Timeout(deadline) => Self::Timeout(deadline),
            AccountError::ActorCommunicationError(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Validation(v) => Self::Validation(v.to_string()),
            SettingsError::Storage(s) => Self::Storage(s.to_string()),
            SettingsError::Timeout(deadline) => Self::Timeout(deadline),
            SettingsError::ActorCommunicationError(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::BadRequest(format!("Request body is not valid JSON: {e}"))
    }
}
