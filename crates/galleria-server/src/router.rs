//! Request routing and path matching.
//!
//! Routes are registered once by [`App::build`](crate::App) with an index
//! into the application's route table. Path templates use `{param}`
//! segments; `:param` segments are accepted and normalized to `{param}`.
//!
//! Two templates conflict when they have the same *shape*: the same method,
//! the same literal segments and parameters in the same positions,
//! whatever the parameter names. When several templates match a request,
//! the one with the most literal segments wins, so `/albums/new` beats
//! `/albums/{id}`.
//!
//! # Example
//!
//! ```rust
//! use galleria_server::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/users/{userId}", 0).unwrap();
//! router.add_route(Method::POST, "/users", 1).unwrap();
//!
//! let m = router.match_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(m.index(), 0);
//! assert_eq!(m.param("userId"), Some("123"));
//!
//! // Same shape, different parameter name.
//! assert!(router.add_route(Method::GET, "/users/{id}", 2).is_err());
//! ```

use std::collections::HashMap;

use http::Method;

/// A matched route with extracted path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    index: usize,
    params: HashMap<String, String>,
}

impl RouteMatch {
    /// Returns the route table index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the extracted path parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Consumes the match, returning the parameters.
    #[must_use]
    pub fn into_params(self) -> HashMap<String, String> {
        self.params
    }

    /// Returns a specific path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Why a route could not be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The template is malformed.
    InvalidPath(String),
    /// A route of the same method and shape exists.
    Conflict {
        /// Index of the route already registered.
        existing: usize,
    },
}

/// A segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

impl PathSegment {
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    index: usize,
}

impl Route {
    fn parse_segments(pattern: &str) -> Result<Vec<PathSegment>, RouteError> {
        pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                let name = s
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                    .or_else(|| s.strip_prefix(':'));
                match name {
                    Some(name) if is_param_name(name) => Ok(PathSegment::Param(name.to_string())),
                    Some(_) => Err(RouteError::InvalidPath(pattern.to_string())),
                    None if s.contains(['{', '}']) => Err(RouteError::InvalidPath(pattern.to_string())),
                    None => Ok(PathSegment::Literal(s.to_string())),
                }
            })
            .collect()
    }

    fn same_shape(&self, method: &Method, segments: &[PathSegment]) -> bool {
        self.method == *method
            && self.segments.len() == segments.len()
            && self.segments.iter().zip(segments).all(|(a, b)| a.same_shape(b))
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PathSegment::Literal(_)))
            .count()
    }

    fn match_path(&self, path_segments: &[&str]) -> Option<HashMap<String, String>> {
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(path_segments) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
                // Undecodable parameters make the route not match.
                PathSegment::Param(name) => {
                    let decoded = urlencoding::decode(actual).ok()?;
                    params.insert(name.clone(), decoded.into_owned());
                }
            }
        }

        Some(params)
    }
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// HTTP request router.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Adds a route pointing at `index`.
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: impl AsRef<str>,
        index: usize,
    ) -> Result<(), RouteError> {
        let segments = Route::parse_segments(pattern.as_ref())?;

        if let Some(existing) = self.routes.iter().find(|r| r.same_shape(&method, &segments)) {
            return Err(RouteError::Conflict {
                existing: existing.index,
            });
        }

        self.routes.push(Route {
            method,
            segments,
            index,
        });
        Ok(())
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Matches an incoming request to a route.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .filter_map(|route| route.match_path(&path_segments).map(|params| (route, params)))
            .max_by_key(|(route, _)| route.literal_count())
            .map(|(route, params)| RouteMatch {
                index: route.index,
                params,
            })
    }
}

/// Joins a controller base path and an endpoint path.
///
/// Repeated slashes collapse, the result has exactly one leading slash and
/// no trailing slash except for the root. A base of `/` adds nothing.
///
/// ```rust
/// use galleria_server::join_paths;
///
/// assert_eq!(join_paths("/", "/dashboard"), "/dashboard");
/// assert_eq!(join_paths("/api/v1", "/albums"), "/api/v1/albums");
/// assert_eq!(join_paths("/api/v1/", "//albums/"), "/api/v1/albums");
/// assert_eq!(join_paths("/", "/"), "/");
/// ```
#[must_use]
pub fn join_paths(base: &str, path: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Rewrites `:param` segments as `{param}`.
#[must_use]
pub fn normalize_template(path: &str) -> String {
    let joined = join_paths("/", path);
    if joined == "/" {
        return joined;
    }
    let segments: Vec<String> = joined
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => s.to_string(),
        })
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_router_match_simple_path() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/healthz", 0).unwrap();

        let m = router.match_route(&Method::GET, "/healthz").unwrap();
        assert_eq!(m.index(), 0);
        assert!(m.params().is_empty());
    }

    #[test]
    fn test_router_match_with_multiple_params() {
        let mut router = Router::new();
        router
            .add_route(Method::GET, "/tenants/{tenantId}/albums/{albumId}", 3)
            .unwrap();

        let m = router.match_route(&Method::GET, "/tenants/t1/albums/a9").unwrap();
        assert_eq!(m.index(), 3);
        assert_eq!(m.param("tenantId"), Some("t1"));
        assert_eq!(m.param("albumId"), Some("a9"));
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/albums/{name}", 0).unwrap();

        let m = router.match_route(&Method::GET, "/albums/caf%C3%A9%20trip").unwrap();
        assert_eq!(m.param("name"), Some("café trip"));

        // An encoded slash stays inside the segment.
        let m = router.match_route(&Method::GET, "/albums/a%2Fb").unwrap();
        assert_eq!(m.param("name"), Some("a/b"));

        assert!(router.match_route(&Method::GET, "/albums/%FF").is_none());
    }

    #[test]
    fn test_router_mismatches() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/albums/{id}", 0).unwrap();

        assert!(router.match_route(&Method::POST, "/albums/1").is_none());
        assert!(router.match_route(&Method::GET, "/albums").is_none());
        assert!(router.match_route(&Method::GET, "/albums/1/extra").is_none());
        assert!(router.match_route(&Method::GET, "/photos/1").is_none());
    }

    #[test]
    fn test_colon_params() {
        let mut router = Router::new();
        router.add_route(Method::DELETE, "/albums/:id", 0).unwrap();

        let m = router.match_route(&Method::DELETE, "/albums/42").unwrap();
        assert_eq!(m.param("id"), Some("42"));
    }

    #[test]
    fn test_conflict_by_shape() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/albums/{id}", 0).unwrap();

        assert_eq!(
            router.add_route(Method::GET, "/albums/{albumId}", 1),
            Err(RouteError::Conflict { existing: 0 })
        );
        assert!(router.add_route(Method::PUT, "/albums/{albumId}", 1).is_ok());
        assert!(router.add_route(Method::GET, "/albums/new", 2).is_ok());
    }

    #[test]
    fn test_literal_beats_param() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/albums/{id}", 0).unwrap();
        router.add_route(Method::GET, "/albums/new", 1).unwrap();

        assert_eq!(router.match_route(&Method::GET, "/albums/new").unwrap().index(), 1);
        assert_eq!(router.match_route(&Method::GET, "/albums/a1").unwrap().index(), 0);
    }

    #[test]
    fn test_invalid_templates() {
        let mut router = Router::new();
        assert!(matches!(
            router.add_route(Method::GET, "/albums/{}", 0),
            Err(RouteError::InvalidPath(_))
        ));
        assert!(matches!(
            router.add_route(Method::GET, "/albums/{id", 0),
            Err(RouteError::InvalidPath(_))
        ));
        assert!(matches!(
            router.add_route(Method::GET, "/albums/:", 0),
            Err(RouteError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_trailing_slash_and_root() {
        let mut router = Router::new();
        router.add_route(Method::GET, "/", 0).unwrap();
        router.add_route(Method::GET, "/dashboard", 1).unwrap();

        assert_eq!(router.match_route(&Method::GET, "/").unwrap().index(), 0);
        assert_eq!(router.match_route(&Method::GET, "/dashboard/").unwrap().index(), 1);
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/dashboard"), "/dashboard");
        assert_eq!(join_paths("/api/v1", "/albums"), "/api/v1/albums");
        assert_eq!(join_paths("/api/v1", "/"), "/api/v1");
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("api", "albums/{id}"), "/api/albums/{id}");
    }

    #[test]
    fn test_normalize_template() {
        assert_eq!(normalize_template("/albums/:id/"), "/albums/{id}");
        assert_eq!(normalize_template("/albums/{id}"), "/albums/{id}");
        assert_eq!(normalize_template("//"), "/");
    }

    proptest! {
        #[test]
        fn prop_join_paths_is_canonical(
            base in "(/?[a-z]{0,4}){0,3}/?",
            path in "(/?[a-z]{0,4}){0,3}/?",
        ) {
            let joined = join_paths(&base, &path);
            prop_assert!(joined.starts_with('/'));
            prop_assert!(!joined.contains("//"));
            prop_assert!(joined == "/" || !joined.ends_with('/'));
            prop_assert_eq!(join_paths("/", &joined), joined.clone());
        }
    }
}
