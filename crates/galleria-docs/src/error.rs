//! Error types for document generation.

use thiserror::Error;

/// Errors that can occur during documentation generation.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the document to JSON.
    #[error("Failed to serialize OpenAPI document: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// An operation cannot be represented.
    #[error("Invalid operation '{operation_id}': {reason}")]
    InvalidOperation {
        /// The operation ID that is invalid.
        operation_id: String,
        /// The reason the operation is invalid.
        reason: String,
    },

    /// Two operations share a method and path.
    #[error("Duplicate operation {method} {path}")]
    DuplicateOperation {
        /// HTTP method.
        method: String,
        /// Path template.
        path: String,
    },
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;
