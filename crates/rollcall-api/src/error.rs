//! API error handling and the response envelope
//!
//! Every endpoint answers with the same envelope:
//! `{ "success": bool, "message": string, "data": object? }`.
//! Business failures map onto it through [`AppError`]; unexpected failures
//! are logged and surfaced as a generic 500 with no internal detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rollcall_core::RollcallError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success envelope carrying a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success envelope with a message only
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Failure envelope
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Application error type
///
/// Variants map one-to-one onto HTTP statuses; enumeration-sensitive paths
/// (login, reset) deliberately answer with fixed generic messages.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is temporarily locked")]
    Locked { retry_after_secs: i64 },

    #[error("Invalid or expired reset token")]
    InvalidToken,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AppError::Locked { retry_after_secs } => (
                StatusCode::LOCKED,
                format!(
                    "Account locked due to too many failed attempts. Try again in {retry_after_secs} seconds."
                ),
            ),
            AppError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "Invalid or expired reset token".to_string(),
            ),
            AppError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, format!("{resource} not found"))
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

impl From<RollcallError> for AppError {
    fn from(err: RollcallError) -> Self {
        match err {
            RollcallError::NotFound(msg) => AppError::NotFound(msg),
            RollcallError::ValidationError(msg) => AppError::Validation(msg),
            RollcallError::Conflict(msg) => AppError::Conflict(msg),
            RollcallError::DatabaseError(msg) => AppError::Database(msg),
            RollcallError::ConfigError(msg) => AppError::Internal(msg),
            RollcallError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
