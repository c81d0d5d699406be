// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::diagnosis::ProviderError;
use crate::history::{StoreError, ValidationError};

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    fn with_code(status_code: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code: Some(code.to_string()),
        }
    }

    /// Create a new bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Storage could not complete the read or write
    pub fn storage(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", message)
    }

    /// No diagnosis provider is configured
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE", message)
    }

    /// The diagnosis provider failed or answered nonsense
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response_json = json!({
            "error": true,
            "message": self.message,
            "status": self.status_code.as_u16()
        });

        if let Some(error_code) = self.error_code {
            response_json["error_code"] = json!(error_code);
        }

        (self.status_code, Json(response_json)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        error!("Storage failure: {}", err);
        ApiError::storage(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        validation_error(err.field, &err.reason)
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidImage(reason) => invalid_param_error("image", &reason),
            other => {
                error!("Diagnosis provider failure: {}", other);
                ApiError::upstream(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(rejection.body_text())
        } else {
            ApiError::bad_request(rejection.body_text())
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Helper function for validation errors
pub fn validation_error(field: &str, reason: &str) -> ApiError {
    let message = format!("Validation failed for {field}: {reason}");
    ApiError::bad_request(message)
}

/// Helper function for invalid parameter errors
pub fn invalid_param_error(param_name: &str, reason: &str) -> ApiError {
    ApiError::bad_request(format!("Invalid parameter '{param_name}': {reason}"))
}
