use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::relay::RelayError;

// ============================================================================
// Upload envelope
// ============================================================================

/// Upload result. Always sent with HTTP 200; `code` tells success (1) from
/// failure (0), and `message` carries the URL or the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub code: u8,
    pub message: String,
}

impl UploadResponse {
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            code: 1,
            message: url.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
        }
    }
}

impl IntoResponse for UploadResponse {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::OK, Json(self)).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}

// ============================================================================
// Plain-text errors for the download route
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::NotFound => ApiError::NotFound,
            RelayError::Backend(inner) => {
                tracing::error!(error = %inner, "Failed to fetch content");
                ApiError::Internal("Failed to fetch content".to_string())
            }
            RelayError::Read(inner) => {
                tracing::warn!(error = %inner, "Failed to read content");
                ApiError::BadGateway("Failed to read content".to_string())
            }
            RelayError::Manifest(inner) => {
                tracing::warn!(error = %inner, "Stored manifest is unreadable");
                ApiError::BadGateway("Malformed manifest".to_string())
            }
        }
    }
}
