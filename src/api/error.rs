//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::integrations::IntegrationError;
use crate::processing::ProcessError;
use crate::storage::StorageError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("{0}")]
    Validation(String),

    /// Request cannot be served as sent
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// A third-party service failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn run_not_found() -> Self {
        ApiError::NotFound("Run not found".to_string())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::UnsupportedFormat(_) | ProcessError::InvalidFile(_) => ApiError::BadRequest(err.to_string()),
            ProcessError::RunNotFound(_) | ProcessError::NoStoredFiles(_) | ProcessError::FileMissing(_) => {
                ApiError::NotFound(err.to_string())
            }
            ProcessError::Storage(e) => ApiError::Storage(e),
            ProcessError::Io(e) => ApiError::Io(e),
            ProcessError::Task(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<IntegrationError> for ApiError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::NotConfigured | IntegrationError::NotLinked | IntegrationError::AuthFailed(_) => {
                ApiError::BadRequest(err.to_string())
            }
            IntegrationError::ApiError(_) | IntegrationError::ParseError(_) => ApiError::Upstream(err.to_string()),
            IntegrationError::Io(e) => ApiError::Io(e),
            IntegrationError::Storage(e) => ApiError::Storage(e),
            IntegrationError::Process(e) => e.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_errors_map_to_status() {
        let cases = [
            (ProcessError::UnsupportedFormat("a.txt".into()), StatusCode::BAD_REQUEST),
            (ProcessError::InvalidFile("bad".into()), StatusCode::BAD_REQUEST),
            (ProcessError::NoStoredFiles(1), StatusCode::NOT_FOUND),
            (ProcessError::Task("panicked".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn test_integration_errors_map_to_status() {
        let not_linked = ApiError::from(IntegrationError::NotLinked);
        assert_eq!(not_linked.status_and_code().0, StatusCode::BAD_REQUEST);
        assert_eq!(not_linked.to_string(), "Strava not linked. Hit /strava/auth_url first.");

        let upstream = ApiError::from(IntegrationError::ApiError("boom".into()));
        assert_eq!(upstream.status_and_code().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validation_is_unprocessable() {
        let response = ApiError::Validation("distance_mi must be > 0".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
