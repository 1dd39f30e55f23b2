//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

use docex_core::error::DocexError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn bad_gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, code, message)
    }

    pub fn unavailable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

// Convert from docex-core errors
impl From<DocexError> for ApiError {
    fn from(err: DocexError) -> Self {
        let code = err.code().as_str();
        let suggestion = err.suggestion().map(str::to_string);

        let api = match err {
            DocexError::Validation {
                message, details, ..
            } => {
                let api = Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, message);
                if details.is_empty() {
                    api
                } else {
                    api.with_details(json!(details))
                }
            }
            DocexError::NotFound { message, .. } => {
                Self::new(StatusCode::NOT_FOUND, code, message)
            }
            DocexError::TextExtraction { message, .. } | DocexError::Semantic { message, .. } => {
                Self::bad_gateway(code, message)
            }
            DocexError::Network { message, .. } => Self::bad_gateway(code, message),
            DocexError::CacheStore { message, .. } => Self::unavailable(code, message),
            DocexError::Configuration(msg) => Self::bad_request(msg),
            DocexError::UnsupportedProvider { provider } => {
                Self::bad_request(format!("Unsupported provider: {}", provider))
            }
            DocexError::Extraction { message, field, .. } => {
                let api = Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message);
                match field {
                    Some(field) => api.with_details(json!({ "field": field })),
                    None => api,
                }
            }
            DocexError::Parse { message, .. } => {
                Self::new(StatusCode::BAD_REQUEST, code, format!("Parse error: {}", message))
            }
            DocexError::Serialization(e) => {
                Self::internal(format!("Serialization error: {}", e))
            }
            DocexError::Io(e) => Self::internal(format!("IO error: {}", e)),
            DocexError::Internal(msg) => Self::internal(msg),
        };

        match (api.details.is_none(), suggestion) {
            (true, Some(suggestion)) => api.with_details(json!({ "suggestion": suggestion })),
            _ => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
