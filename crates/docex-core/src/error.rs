//! Error types for docex operations.
//!
//! This module provides the error hierarchy shared by every crate in the
//! workspace, with structured error codes and suggestions for resolution.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for docex operations.
pub type DocexResult<T> = Result<T, DocexError>;

/// Main error type for all docex operations.
#[derive(Error, Debug)]
pub enum DocexError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Batch job not found.
    #[error("Job not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        job_id: Option<String>,
    },

    /// A single field could not be extracted.
    #[error("Extraction error: {message}")]
    Extraction {
        message: String,
        code: ErrorCode,
        field: Option<String>,
    },

    /// The text-extraction collaborator failed.
    #[error("Text extraction error: {message}")]
    TextExtraction {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The semantic/GPT fallback collaborator failed.
    #[error("Semantic extraction error: {message}")]
    Semantic {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cache store operation failed.
    #[error("Cache store error: {message}")]
    CacheStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidFormat,
    ValDuplicateItem,

    // Jobs (JOB_xxx)
    JobNotFound,

    // Field extraction (EXT_xxx)
    ExtPatternFailed,

    // Text extraction service (TXT_xxx)
    TxtServiceFailed,
    TxtEmptyResponse,

    // Semantic service (SEM_xxx)
    SemServiceFailed,
    SemInvalidResponse,

    // Cache store (CACHE_xxx)
    CacheOperationFailed,
    CacheUnavailable,
    CacheCorrupted,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidFormat => "VAL_003",
            ErrorCode::ValDuplicateItem => "VAL_004",
            ErrorCode::JobNotFound => "JOB_001",
            ErrorCode::ExtPatternFailed => "EXT_001",
            ErrorCode::TxtServiceFailed => "TXT_001",
            ErrorCode::TxtEmptyResponse => "TXT_002",
            ErrorCode::SemServiceFailed => "SEM_001",
            ErrorCode::SemInvalidResponse => "SEM_002",
            ErrorCode::CacheOperationFailed => "CACHE_001",
            ErrorCode::CacheUnavailable => "CACHE_002",
            ErrorCode::CacheCorrupted => "CACHE_003",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl DocexError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a validation error for a specific item field.
    pub fn missing_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.into());
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: None,
        }
    }

    /// Create a validation error for malformed content.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidFormat,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for an item submitted twice.
    pub fn duplicate_item(file_id: impl Into<String>) -> Self {
        let file_id = file_id.into();
        let mut details = HashMap::new();
        details.insert("fileId".to_string(), file_id.clone());
        Self::Validation {
            message: format!("Duplicate fileId '{}'", file_id),
            code: ErrorCode::ValDuplicateItem,
            details,
            suggestion: Some("Give every item in the batch a distinct fileId".to_string()),
        }
    }

    /// Create a job not found error.
    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        let id = job_id.into();
        Self::NotFound {
            message: format!("Job with id '{}' not found", id),
            code: ErrorCode::JobNotFound,
            job_id: Some(id),
        }
    }

    /// Create a field extraction error.
    pub fn extraction(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
            code: ErrorCode::ExtPatternFailed,
            field: Some(field.into()),
        }
    }

    /// Create a text-extraction service error.
    pub fn text_extraction(message: impl Into<String>) -> Self {
        Self::TextExtraction {
            message: message.into(),
            code: ErrorCode::TxtServiceFailed,
            source: None,
        }
    }

    /// Create a semantic service error.
    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
            code: ErrorCode::SemServiceFailed,
            source: None,
        }
    }

    /// Create a cache store error.
    pub fn cache_store(message: impl Into<String>) -> Self {
        Self::CacheStore {
            message: message.into(),
            code: ErrorCode::CacheOperationFailed,
            source: None,
        }
    }

    /// Create a cache store error wrapping the driver error.
    pub fn cache_store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::CacheStore {
            message: message.into(),
            code: ErrorCode::CacheOperationFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create an error for a cache backend that cannot be reached.
    pub fn cache_unavailable(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::CacheStore {
            message: message.into(),
            code: ErrorCode::CacheUnavailable,
            source: Some(Box::new(source)),
        }
    }

    /// Create a corrupted cache record error.
    pub fn cache_corrupted(message: impl Into<String>) -> Self {
        Self::CacheStore {
            message: message.into(),
            code: ErrorCode::CacheCorrupted,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetTimeout,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Extraction { code, .. } => *code,
            Self::TextExtraction { code, .. } => *code,
            Self::Semantic { code, .. } => *code,
            Self::CacheStore { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// True when the failure happened before a collaborator could answer.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => Some("Please check the job ID and ensure the job was submitted"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::TextExtraction { .. } => {
                Some("Please check that the text extraction service is running")
            }
            Self::Semantic { .. } => Some("Please check that the smart-extract service is running"),
            Self::CacheStore { .. } => Some("Please check your cache store connection settings"),
            Self::Network { .. } => Some("Please check the service URL and network connectivity"),
            _ => None,
        }
    }

    /// Convert from HTTP status code (for client errors).
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            400 | 422 => Self::Validation {
                message: body.to_string(),
                code: ErrorCode::ValInvalidInput,
                details: HashMap::new(),
                suggestion: Some("Please check your request parameters".to_string()),
            },
            404 => Self::NotFound {
                message: body.to_string(),
                code: ErrorCode::JobNotFound,
                job_id: None,
            },
            408 | 504 => Self::timeout(body.to_string()),
            _ => Self::Internal(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DocexError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_job_not_found_error() {
        let err = DocexError::job_not_found("job-1");
        assert_eq!(err.code(), ErrorCode::JobNotFound);
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("job-1"));
    }

    #[test]
    fn test_missing_field_details() {
        let err = DocexError::missing_field("fileId", "fileId is required");
        match err {
            DocexError::Validation { details, code, .. } => {
                assert_eq!(code, ErrorCode::ValMissingField);
                assert_eq!(details.get("field").map(String::as_str), Some("fileId"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(DocexError::api("connection refused").is_connectivity());
        assert!(!DocexError::text_extraction("success=false").is_connectivity());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValInvalidInput.as_str(), "VAL_001");
        assert_eq!(ErrorCode::CacheCorrupted.as_str(), "CACHE_003");
        assert_eq!(ErrorCode::JobNotFound.as_str(), "JOB_001");
    }
}
