//! Controllers group endpoints under a base path.

use std::collections::HashSet;
use std::sync::Arc;

use galleria_middleware::MiddlewareUnit;

use crate::endpoint::{Endpoint, EndpointBuilder};
use crate::error::ConfigError;

/// Starts describing a controller mounted at `base_path`.
///
/// ```
/// use galleria_core::ApiError;
/// use galleria_server::{controller, endpoint};
/// use http::Method;
///
/// let albums = controller("/api/v1/albums")
///     .tag("Albums")
///     .description("Album management")
///     .endpoints(vec![endpoint(Method::GET, "/", "listAlbums")
///         .handler(|_ctx| async move { Ok::<_, ApiError>(Vec::<String>::new()) })])
///     .build()
///     .unwrap();
///
/// assert_eq!(albums.endpoints().len(), 1);
/// ```
pub fn controller(base_path: impl Into<String>) -> ControllerBuilder {
    ControllerBuilder {
        base_path: base_path.into(),
        description: None,
        tag: None,
        middleware: Vec::new(),
        endpoints: Vec::new(),
        endpoint_calls: 0,
    }
}

/// Accumulates a controller description.
#[derive(Debug)]
pub struct ControllerBuilder {
    base_path: String,
    description: Option<String>,
    tag: Option<String>,
    middleware: Vec<Arc<MiddlewareUnit>>,
    endpoints: Vec<EndpointBuilder>,
    endpoint_calls: usize,
}

impl ControllerBuilder {
    /// Sets the description, used for the tag in the API documentation.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the OpenAPI tag of every endpoint.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Appends a controller-level middleware unit.
    pub fn middleware(mut self, unit: impl Into<Arc<MiddlewareUnit>>) -> Self {
        self.middleware.push(unit.into());
        self
    }

    /// Sets the endpoints. Must be called once.
    pub fn endpoints(mut self, endpoints: Vec<EndpointBuilder>) -> Self {
        self.endpoint_calls += 1;
        self.endpoints = endpoints;
        self
    }

    /// Returns the base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Checks every endpoint and freezes the controller.
    pub fn build(self) -> Result<Controller, ConfigError> {
        if self.endpoint_calls > 1 {
            return Err(ConfigError::EndpointsRedefined {
                base_path: self.base_path,
            });
        }

        let mut names = HashSet::new();
        let mut endpoints = Vec::with_capacity(self.endpoints.len());
        for builder in self.endpoints {
            if !names.insert(builder.name().to_string()) {
                return Err(ConfigError::DuplicateEndpointName {
                    base_path: self.base_path,
                    name: builder.name().to_string(),
                });
            }
            endpoints.push(builder.build()?);
        }

        Ok(Controller {
            base_path: self.base_path,
            description: self.description,
            tag: self.tag,
            middleware: self.middleware,
            endpoints,
        })
    }
}

/// A checked, immutable controller.
#[derive(Debug, Clone)]
pub struct Controller {
    base_path: String,
    description: Option<String>,
    tag: Option<String>,
    middleware: Vec<Arc<MiddlewareUnit>>,
    endpoints: Vec<Endpoint>,
}

impl Controller {
    /// Returns the base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the tag.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Returns the controller-level middleware.
    pub fn middleware(&self) -> &[Arc<MiddlewareUnit>] {
        &self.middleware
    }

    /// Returns the endpoints in declaration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::endpoint;
    use galleria_core::ApiError;
    use http::Method;

    fn ep(method: Method, path: &str, name: &str) -> EndpointBuilder {
        endpoint(method, path, name).handler(|_ctx| async move { Ok::<_, ApiError>(()) })
    }

    #[test]
    fn test_endpoints_redefined() {
        let err = controller("/albums")
            .endpoints(vec![ep(Method::GET, "/", "list")])
            .endpoints(vec![ep(Method::POST, "/", "create")])
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigError::EndpointsRedefined { base_path } if base_path == "/albums"));
    }

    #[test]
    fn test_duplicate_endpoint_name() {
        let err = controller("/albums")
            .endpoints(vec![ep(Method::GET, "/", "list"), ep(Method::GET, "/all", "list")])
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateEndpointName { name, .. } if name == "list"));
    }

    #[test]
    fn test_missing_target_surfaces() {
        let err = controller("/")
            .endpoints(vec![endpoint(Method::GET, "/dashboard", "dashboard")])
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigError::MissingTarget { .. }));
    }

    #[test]
    fn test_empty_controller_is_valid() {
        let built = controller("/empty").tag("Empty").build().unwrap();
        assert!(built.endpoints().is_empty());
        assert_eq!(built.tag(), Some("Empty"));
    }
}
