//! Error handling for the BakeStock backend
//!
//! One taxonomy for every workflow: caller errors (validation, bad
//! references), recoverable lookups (not found), capacity violations
//! (insufficient stock), and retryable concurrency conflicts.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors (token verification only; issuance is external)
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    // Caller errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Business-rule capacity violations
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Insufficient batch quantity in batch {batch_id}")]
    InsufficientBatchQuantity { batch_id: i32 },

    // Retryable: lock/serialization failure
    #[error("Concurrency conflict, retry the request")]
    ConcurrencyConflict,

    // Infrastructure
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                // foreign_key_violation
                Some("23503") => {
                    return AppError::InvalidReference(
                        db_err.constraint().unwrap_or("foreign key").to_string(),
                    )
                }
                // unique_violation
                Some("23505") => {
                    return AppError::Conflict(
                        db_err.constraint().unwrap_or("unique constraint").to_string(),
                    )
                }
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => return AppError::ConcurrencyConflict,
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message: "Invalid token".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message: "Token has expired".to_string(),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::InvalidReference(target) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_REFERENCE".to_string(),
                    message: format!("Referenced record does not exist: {}", target),
                    field: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::Conflict(what) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message: format!("Conflicts with an existing record: {}", what),
                    field: None,
                },
            ),
            AppError::InsufficientStock { requested, available } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: format!(
                        "Requested quantity {} exceeds available stock {}",
                        requested, available
                    ),
                    field: None,
                },
            ),
            AppError::InsufficientBatchQuantity { batch_id } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_BATCH_QUANTITY".to_string(),
                    message: format!(
                        "Batch {} has less remaining quantity than requested",
                        batch_id
                    ),
                    field: None,
                },
            ),
            AppError::ConcurrencyConflict => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONCURRENCY_CONFLICT".to_string(),
                    message: "The operation conflicted with a concurrent request; retry"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request failed: {:?}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
