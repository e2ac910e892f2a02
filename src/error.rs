// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("User service error: {0}")]
    UserService(String),

    #[error("Recommendation model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Failed to publish activity: {0}")]
    Publish(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether a queue consumer should expect a redelivery to succeed.
    ///
    /// Shape problems in the request itself never get better on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ModelUnavailable(_)
                | AppError::Database(_)
                | AppError::UserService(_)
                | AppError::Internal(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::InvalidUser(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_user", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::UserService(msg) => {
                tracing::error!(error = %msg, "User service error");
                (StatusCode::BAD_GATEWAY, "user_service_error", None)
            }
            AppError::ModelUnavailable(msg) => {
                tracing::error!(error = %msg, "Recommendation model unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", None)
            }
            AppError::Publish(msg) => {
                tracing::error!(error = %msg, "Publish error");
                (StatusCode::INTERNAL_SERVER_ERROR, "publish_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
