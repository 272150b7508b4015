//! Errors raised below the HTTP layer.
//!
//! Both enums convert into [`ApiError`] so services and handlers can use `?`
//! and let the dispatch engine pick the response status.

use galleria_core::ApiError;
use thiserror::Error;

/// Storage failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Another live album in the tenant already uses this name.
    #[error("album name '{name}' is already taken")]
    DuplicateName {
        /// The conflicting name.
        name: String,
    },

    /// The record to modify does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
    },

    /// The backing store could not be reached or returned garbage.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Creates a [`RepositoryError::NotFound`] for an album.
    #[must_use]
    pub fn album_not_found() -> Self {
        Self::NotFound { entity: "album" }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateName { name } => {
                ApiError::conflict(format!("An album named '{name}' already exists"))
            }
            RepositoryError::NotFound { entity: "album" } => ApiError::not_found("Album not found"),
            RepositoryError::NotFound { entity } => ApiError::not_found(format!("{entity} not found")),
            err @ RepositoryError::Unavailable(_) => {
                ApiError::internal_with_source("Storage request failed", err)
            }
        }
    }
}

/// Failures talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Transport-level failure.
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("identity provider rejected the request with status {status}")]
    Rejected {
        /// HTTP status returned by the provider.
        status: u16,
    },

    /// A required claim is absent.
    #[error("missing claim '{0}'")]
    MissingClaim(&'static str),

    /// The provider's response could not be understood.
    #[error("invalid identity provider response: {0}")]
    InvalidResponse(String),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { .. } | IdentityError::MissingClaim(_) => {
                ApiError::unauthorized("Login failed")
            }
            err => ApiError::internal_with_source("Identity provider unavailable", err),
        }
    }
}

/// Failures while assembling the application.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The identity provider client could not be built.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Bundled templates failed to compile.
    #[error(transparent)]
    Views(#[from] galleria_server::ViewError),

    /// The route table was rejected.
    #[error(transparent)]
    Routes(#[from] galleria_server::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::ErrorKind;

    #[test]
    fn test_duplicate_name_is_conflict() {
        let err: ApiError = RepositoryError::DuplicateName {
            name: "Summer".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.message(), "An album named 'Summer' already exists");
    }

    #[test]
    fn test_not_found_mapping() {
        let err: ApiError = RepositoryError::album_not_found().into();
        assert_eq!(err.status_code().as_u16(), 404);
        assert_eq!(err.message(), "Album not found");
    }

    #[test]
    fn test_unavailable_is_internal() {
        let err: ApiError = RepositoryError::Unavailable("pool closed".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_identity_mapping() {
        let rejected: ApiError = IdentityError::Rejected { status: 400 }.into();
        assert_eq!(rejected.kind(), ErrorKind::Unauthorized);

        let garbled: ApiError = IdentityError::InvalidResponse("not json".to_string()).into();
        assert_eq!(garbled.kind(), ErrorKind::Internal);
    }
}
