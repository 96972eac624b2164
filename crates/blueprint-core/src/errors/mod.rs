// ABOUTME: Unified error type, error codes, and HTTP status mapping for all Blueprint crates
// ABOUTME: Upstream failures render as a generic 500 body while details stay in server logs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # Unified Error Handling System
//!
//! Defines the standard error codes, the `AppError` type, and the JSON body
//! rendered for HTTP clients. Client mistakes (4xx) echo their message;
//! upstream dependency failures (database, LLM vendor, vault, tools) are
//! reported as a generic "Internal Server Error" and logged server-side.

mod tool;

pub use tool::ToolError;

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication & Authorization
    /// No credentials were supplied
    AuthRequired,
    /// Credentials were supplied but rejected
    AuthInvalid,
    /// Authenticated, but not allowed to touch this tenant scope
    PermissionDenied,

    // Validation
    /// Malformed request body or parameter
    InvalidInput,
    /// Required field or query parameter missing
    MissingRequiredField,

    // Resource Management
    /// No matching row
    ResourceNotFound,
    /// Unique constraint conflict
    ResourceAlreadyExists,

    // External Services
    /// LLM vendor, embedding API, or vault failure
    ExternalServiceError,

    // Configuration
    /// Missing or invalid configuration
    ConfigError,

    // Internal Errors
    /// Unexpected internal failure
    InternalError,
    /// Database operation failed
    DatabaseError,
    /// Serialization or deserialization failed
    SerializationError,
    /// The tool-calling loop did not converge
    ToolLoopExceeded,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::MissingRequiredField => 400,
            Self::AuthRequired | Self::AuthInvalid => 401,
            Self::PermissionDenied => 403,
            Self::ResourceNotFound => 404,
            Self::ResourceAlreadyExists => 409,
            Self::ExternalServiceError
            | Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError
            | Self::ToolLoopExceeded => 500,
        }
    }

    /// Whether this code hides its message from clients
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        self.http_status() >= 500
    }
}

/// Unified error type for the application
#[derive(Debug, thiserror::Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Tenant or ownership check failed
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, resource)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Missing required field or query parameter
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required parameter: {field}"),
        )
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// External service error
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }

    /// The orchestration loop hit its iteration cap
    #[must_use]
    pub fn tool_loop_exceeded(max_iterations: usize) -> Self {
        Self::new(
            ErrorCode::ToolLoopExceeded,
            format!("tool loop exceeded after {max_iterations} vendor calls"),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of an error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Client-facing message
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        let message = if error.code.is_server_error() {
            "Internal Server Error".to_owned()
        } else {
            error.message.clone()
        };
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message,
            },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string()).with_source(error)
    }
}

impl From<ToolError> for AppError {
    fn from(error: ToolError) -> Self {
        let code = match &error {
            ToolError::UnknownTool { .. } | ToolError::InvalidArguments { .. } => {
                ErrorCode::InternalError
            }
            ToolError::ExecutionFailed { .. } | ToolError::Cancelled { .. } => {
                ErrorCode::ExternalServiceError
            }
        };
        Self::new(code, error.to_string())
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("Row not found"),
            other => Self::database(other.to_string()).with_source(other),
        }
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http::StatusCode;

    use super::{AppError, ErrorResponse};

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

            if self.code.is_server_error() {
                tracing::error!(
                    error.code = ?self.code,
                    error.message = %self.message,
                    error.source = ?self.source,
                    "Request failed"
                );
            } else {
                tracing::debug!(error.code = ?self.code, error.message = %self.message, "Client error");
            }

            (status, Json(ErrorResponse::from(&self))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::AuthRequired.http_status(), 401);
        assert_eq!(ErrorCode::MissingRequiredField.http_status(), 400);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ToolLoopExceeded.http_status(), 500);
    }

    #[test]
    fn test_server_errors_hide_details() {
        let error = AppError::database("UNIQUE constraint failed: documents.id");
        let body = ErrorResponse::from(&error);
        assert_eq!(body.error.message, "Internal Server Error");
        assert_eq!(body.error.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_client_errors_keep_message() {
        let error = AppError::missing_field("resource_group_id");
        let body = ErrorResponse::from(&error);
        assert!(body.error.message.contains("resource_group_id"));

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("MISSING_REQUIRED_FIELD"));
    }

    #[test]
    fn test_tool_error_conversion_names_tool() {
        let error: AppError = ToolError::execution_failed("diagram_search", "timeout").into();
        assert!(error.message.contains("diagram_search"));
        assert!(error.code.is_server_error());
    }
}
