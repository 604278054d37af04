//! HTTP error mapping for alumtrack-ie
//!
//! Every variant renders as `{"error": {"code", "message"}}`. Messages are
//! safe to show to users; underlying causes are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;
use crate::import::DecodeError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 404
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 400
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// 422: well-formed request whose content cannot be processed
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// 409
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 500 with a caller-facing message
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Common(#[from] alumtrack_common::Error),
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        if err.is_user_error() {
            ApiError::Unprocessable(err.to_string())
        } else {
            tracing::error!(error = %err, "Uploaded file could not be read");
            ApiError::Internal("The uploaded file could not be read as a spreadsheet".to_string())
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::EmptyResult => ApiError::NotFound(err.to_string()),
            ExportError::Store(e) => ApiError::Store(e),
            ExportError::Encode(e) => {
                tracing::error!(error = %e, "Spreadsheet encoding failed");
                ApiError::Internal("Failed to build the export spreadsheet".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Store(ref err) => {
                let (status, code) = match err {
                    StoreError::Conflict(_) | StoreError::UniqueViolation { .. } | StoreError::InUse(_) => {
                        (StatusCode::CONFLICT, "CONFLICT")
                    }
                    StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    StoreError::LockTimeout { .. } => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_BUSY"),
                    StoreError::Database(_) | StoreError::Common(_) => {
                        tracing::error!(error = %err, "Database error");
                        (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
                    }
                };
                (status, code, err.user_message())
            }
            ApiError::Common(ref err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMMON_ERROR",
                    "Internal error".to_string(),
                )
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_split_user_and_internal() {
        let response = ApiError::from(DecodeError::Empty).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ApiError::from(DecodeError::UnsupportedFormat("a.pdf".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unreadable = crate::import::decode(b"garbage", crate::import::SpreadsheetFormat::Xlsx).unwrap_err();
        let response = ApiError::from(unreadable).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_error_statuses() {
        let cases = [
            (StoreError::Conflict("taken".to_string()), StatusCode::CONFLICT),
            (StoreError::InUse("Program 1".to_string()), StatusCode::CONFLICT),
            (StoreError::NotFound("Program 9".to_string()), StatusCode::NOT_FOUND),
            (
                StoreError::LockTimeout { attempts: 5, elapsed_ms: 5000 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_empty_export_is_not_found() {
        let response = ApiError::from(ExportError::EmptyResult).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
