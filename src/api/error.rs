use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::IntakeError;

/// JSON error response: `{"error": "<message>"}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

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

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Document not found")
    }

    /// Map an error, hiding server-side detail behind `generic`.
    pub fn from_intake(err: IntakeError, generic: &str) -> Self {
        Self::client_error(&err).unwrap_or_else(|| {
            tracing::error!(error=?err, "{}", generic);
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, generic)
        })
    }

    /// Map an error, echoing server-side detail in the response.
    pub fn echo(err: IntakeError) -> Self {
        Self::client_error(&err).unwrap_or_else(|| {
            tracing::error!(error=?err, "request failed");
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })
    }

    fn client_error(err: &IntakeError) -> Option<Self> {
        if !err.is_client_error() {
            return None;
        }
        Some(match err {
            IntakeError::NotFound { .. } => Self::not_found(),
            _ => Self::bad_request(err.to_string()),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
