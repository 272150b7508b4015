//! Error types for Galleria.
//!
//! This module provides [`ApiError`], the status-bearing error type used by
//! handlers, middleware and the dispatch engine. Every variant maps to one
//! HTTP status through [`ErrorKind`] and serializes to the uniform body
//! `{"error": {"message": ..., "details": ...}}`.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{ValidationFailure, ValidationIssue};

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Message sent to clients in place of internal error messages.
pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

/// Kinds of errors, one per HTTP status the API emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed request (400).
    BadRequest,
    /// Missing or invalid credentials (401).
    Unauthorized,
    /// Authenticated but not permitted (403).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// Conflicting state, e.g. a duplicate name (409).
    Conflict,
    /// Input failed validation (422).
    Validation,
    /// Unexpected server failure (500).
    Internal,
    /// Operation not implemented (501).
    NotImplemented,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

/// Standard error type for Galleria handlers and middleware.
///
/// # Example
///
/// ```
/// use galleria_core::{ApiError, ErrorKind};
///
/// fn find_album(id: &str) -> Result<(), ApiError> {
///     Err(ApiError::not_found(format!("Album {id} not found")))
/// }
///
/// let err = find_album("a1").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be understood.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// Authentication is required.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
    },

    /// The caller may not perform this action.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// The resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The request conflicts with current state.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
        /// Optional structured details.
        details: Option<serde_json::Value>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Per-field issues, passed through to the response verbatim.
        issues: Vec<ValidationIssue>,
    },

    /// Internal server error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message (not exposed in production).
        message: String,
        /// The underlying error (never exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Not implemented.
    #[error("Not implemented: {message}")]
    NotImplemented {
        /// Human-readable error message.
        message: String,
    },
}

impl ApiError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error carrying per-field issues.
    #[must_use]
    pub fn validation(message: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self::Validation {
            message: message.into(),
            issues,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a not implemented error.
    #[must_use]
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    /// Attaches structured details to a bad request or conflict error.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_details(self, value: serde_json::Value) -> Self {
        match self {
            Self::BadRequest { message, .. } => Self::BadRequest {
                message,
                details: Some(value),
            },
            Self::Conflict { message, .. } => Self::Conflict {
                message,
                details: Some(value),
            },
            other => other,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// Returns the bare message, without the kind prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Conflict { message, .. }
            | Self::Validation { message, .. }
            | Self::Internal { message, .. }
            | Self::NotImplemented { message } => message,
        }
    }

    /// Returns the structured details for the response body, if any.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::BadRequest { details, .. } | Self::Conflict { details, .. } => details.clone(),
            Self::Validation { issues, .. } => serde_json::to_value(issues).ok(),
            _ => None,
        }
    }

    /// Converts this error to a serializable envelope.
    ///
    /// When `expose_internal` is false, 5xx errors are reduced to a generic
    /// message without details.
    #[must_use]
    pub fn to_envelope(&self, expose_internal: bool) -> ErrorEnvelope {
        if self.status_code().is_server_error() && !expose_internal {
            return ErrorEnvelope {
                error: ErrorBody {
                    message: GENERIC_INTERNAL_MESSAGE.to_string(),
                    details: None,
                },
            };
        }

        ErrorEnvelope {
            error: ErrorBody {
                message: self.message().to_string(),
                details: self.details(),
            },
        }
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation {
            message: failure.message,
            issues: failure.issues,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    /// The error body.
    pub error: ErrorBody,
}

/// Error body within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Additional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
