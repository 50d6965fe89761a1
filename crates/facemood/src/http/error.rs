use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::StoreError;
use crate::pipeline::PipelineError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An HTTP error: a status and the message sent as `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Logs `detail` and hides it from the caller.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Request failed: {}", detail);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn unavailable(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Document store unavailable: {}", detail);
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "Document store unavailable")
    }

    /// Store failure on a lookup. Malformed ids read as absent documents.
    pub fn from_lookup(err: StoreError, not_found_message: &str) -> Self {
        if err.is_not_found() {
            tracing::debug!("Lookup with unusable id: {}", err);
            return Self::not_found(not_found_message);
        }
        Self::from(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MalformedId(_) => Self::not_found("Not found"),
            StoreError::Unavailable(e) => Self::unavailable(e),
            other => Self::internal(other),
        }
    }
}

/// Mapping used by the upload endpoints.
impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Normalize(e) => {
                tracing::info!("Upload rejected: {}", e);
                Self::bad_request(e.to_string())
            }
            PipelineError::TooLarge { .. } => {
                tracing::info!("Upload rejected: {}", err);
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            PipelineError::NoFaceDetected => Self::bad_request(err.to_string()),
            PipelineError::Store(e) => Self::from(e),
            other => Self::internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
