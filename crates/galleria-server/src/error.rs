//! Registration and lifecycle errors.

use std::io;
use std::net::SocketAddr;

use galleria_docs::DocsError;
use thiserror::Error;

/// A topology error found while building an [`App`](crate::App).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An endpoint declares no handler and no view.
    #[error("endpoint '{endpoint}' ({method} {path}) has no handler or view")]
    MissingTarget {
        /// Endpoint name.
        endpoint: String,
        /// HTTP method.
        method: String,
        /// Endpoint path.
        path: String,
    },

    /// An endpoint declares more than one handler or view.
    #[error("endpoint '{endpoint}' declares {count} targets, expected exactly one")]
    MultipleTargets {
        /// Endpoint name.
        endpoint: String,
        /// Number of targets declared.
        count: usize,
    },

    /// `endpoints(..)` was called more than once on a controller.
    #[error("endpoints for controller '{base_path}' were defined more than once")]
    EndpointsRedefined {
        /// Controller base path.
        base_path: String,
    },

    /// Two endpoints resolve to the same method and path shape.
    #[error("duplicate route {method} {path} (conflicts with '{existing}')")]
    DuplicateRoute {
        /// HTTP method.
        method: String,
        /// Full path of the rejected endpoint.
        path: String,
        /// Name of the endpoint registered first.
        existing: String,
    },

    /// Two endpoints of one controller share a name.
    #[error("duplicate endpoint name '{name}' in controller '{base_path}'")]
    DuplicateEndpointName {
        /// Controller base path.
        base_path: String,
        /// Endpoint name.
        name: String,
    },

    /// A path template is malformed.
    #[error("invalid path template: {0}")]
    InvalidPath(String),

    /// A response content type is not a valid header value.
    #[error("invalid content type '{content_type}' on endpoint '{endpoint}'")]
    InvalidContentType {
        /// Endpoint name.
        endpoint: String,
        /// Content type as declared.
        content_type: String,
    },

    /// A view endpoint exists but no template renderer was configured.
    #[error("endpoint '{endpoint}' renders a view but no template renderer is configured")]
    MissingRenderer {
        /// Endpoint name.
        endpoint: String,
    },

    /// The OpenAPI document could not be generated.
    #[error("failed to generate API documentation: {0}")]
    Docs(#[from] DocsError),
}

/// Errors from the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {addr}: {source}")]
    BindError {
        /// The address that failed to bind.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// `start()` was called on a running server.
    #[error("server is already listening on {0}")]
    AlreadyStarted(SocketAddr),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
