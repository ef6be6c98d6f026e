//! Error types for ifx-faces
//!
//! Batch-fatal errors ([`ValidationError`], [`BatchError`]) and export misuse
//! propagate to the caller. Per-probe comparison failures do not; they are
//! recorded on the batch session.

use crate::models::SetKind;
use crate::services::content_store::HandleError;
use crate::services::result_exporter::ExportError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Input problems detected before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A batch needs both a probe set and a candidate set
    #[error("No {set} files selected")]
    MissingInput { set: SetKind },

    /// Nothing in a selection was an image or PDF
    #[error("No valid image or PDF files in {set} selection")]
    NoValidFiles { set: SetKind },
}

/// Batch control errors
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A batch is validating or running; start and threshold changes are disabled
    #[error("A batch is already running")]
    AlreadyRunning,

    #[error("No batch is running")]
    NotRunning,

    #[error("No batch has been run")]
    NoSession,

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., batch already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::NoResultsToExport => ApiError::NotFound(err.to_string()),
            ExportError::Serialize(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<HandleError> for ApiError {
    fn from(err: HandleError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Validation(e) => e.into(),
            BatchError::AlreadyRunning | BatchError::NotRunning => ApiError::Conflict(err.to_string()),
            BatchError::NoSession => ApiError::NotFound(err.to_string()),
            BatchError::Export(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
