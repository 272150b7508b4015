//! Per-request state handed to middleware and handlers.
//!
//! A [`RequestContext`] is created by the dispatch engine once a route has
//! matched. It is passed *by value* through the BEFORE middleware and into the
//! handler, so each step can enrich it (attach the user, the validated input)
//! without borrowing across await points. AFTER middleware receives the
//! lighter [`RequestMeta`] instead, since the handler consumed the context.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use galleria_core::{ApiError, CurrentUser, RequestId, TenantScope};
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

use crate::session::Session;

/// Context that flows through the BEFORE middleware and into the handler.
///
/// # Example
///
/// ```
/// use galleria_middleware::RequestContext;
/// use http::Method;
///
/// let ctx = RequestContext::builder(Method::GET, "/api/v1/albums?page=2")
///     .path_param("tenant", "t1")
///     .build();
///
/// assert_eq!(ctx.path(), "/api/v1/albums");
/// assert_eq!(ctx.path_param("tenant"), Some("t1"));
/// assert_eq!(ctx.original_url(), "/api/v1/albums?page=2");
/// ```
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: HashMap<String, String>,
    endpoint: Option<String>,
    started_at: Instant,
    session: Session,
    user: Option<CurrentUser>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("endpoint", &self.endpoint)
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Starts building a context.
    pub fn builder(method: Method, uri: impl AsRef<str>) -> RequestContextBuilder {
        RequestContextBuilder::new(method, uri.as_ref())
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns path plus query, as the client requested it.
    #[must_use]
    pub fn original_url(&self) -> String {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path().to_string(), ToString::to_string)
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the path parameters extracted by the router.
    #[must_use]
    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Returns a single path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Returns the query string as ordered `(name, value)` pairs.
    ///
    /// Invalid percent escapes are kept verbatim so the value still reaches
    /// validation. A query that cannot be decoded at all is a 400.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, ApiError> {
        let Some(query) = self.uri.query() else {
            return Ok(Vec::new());
        };
        serde_urlencoded::from_str(query).map_err(|e| {
            tracing::debug!(error = %e, query, "rejecting malformed query string");
            ApiError::bad_request("Malformed query string")
        })
    }

    /// Deserializes the query string into `T`.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_urlencoded::from_str(self.uri.query().unwrap_or_default())
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {e}")))
    }

    /// Returns the matched endpoint name, if any.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Returns when dispatch started.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the session handle.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the authenticated user, if one was loaded.
    #[must_use]
    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Attaches the authenticated user.
    pub fn set_user(&mut self, user: CurrentUser) {
        self.user = Some(user);
    }

    /// Returns the user or a 401.
    pub fn require_user(&self) -> Result<&CurrentUser, ApiError> {
        self.user
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }

    /// Resolves the tenant the request operates on.
    ///
    /// Fails with 401 without a user, and with 403 when the session has no
    /// current tenant or the user is not a member of it.
    pub fn tenant_scope(&self) -> Result<TenantScope, ApiError> {
        let user = self.require_user()?;
        let tenant_id = self
            .session
            .current_tenant_id()
            .ok_or_else(|| ApiError::forbidden("No tenant selected"))?;

        if !user.is_member_of(&tenant_id) {
            return Err(ApiError::forbidden("Not a member of the selected tenant"));
        }

        Ok(TenantScope::new(tenant_id))
    }

    /// Returns the metadata AFTER middleware receive.
    #[must_use]
    pub fn meta(&self) -> RequestMeta {
        RequestMeta {
            request_id: self.request_id,
            method: self.method.clone(),
            path: self.uri.path().to_string(),
            endpoint: self.endpoint.clone(),
            started_at: self.started_at,
            session: self.session.clone(),
        }
    }

    /// Stores a typed extension, replacing any previous value of that type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed extension.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Stores the validated input DTO.
    pub fn set_input<T: Send + Sync + 'static>(&mut self, input: T) {
        self.insert(ValidatedInput(input));
    }

    /// Returns the validated input DTO.
    #[must_use]
    pub fn input<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.get::<ValidatedInput<T>>().map(|v| &v.0)
    }

    /// Takes the validated input DTO.
    ///
    /// Fails with a 500 when no input of that type was validated, which means
    /// the endpoint was declared with a different input type.
    pub fn take_input<T: Send + Sync + 'static>(&mut self) -> Result<T, ApiError> {
        self.remove::<ValidatedInput<T>>()
            .map(|v| v.0)
            .ok_or_else(|| {
                ApiError::internal(format!(
                    "no validated input of type {}",
                    std::any::type_name::<T>()
                ))
            })
    }
}

struct ValidatedInput<T>(T);

/// Builder for [`RequestContext`].
#[derive(Debug)]
pub struct RequestContextBuilder {
    request_id: Option<RequestId>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: HashMap<String, String>,
    endpoint: Option<String>,
    session: Session,
}

impl RequestContextBuilder {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            request_id: None,
            method,
            uri: uri.parse().unwrap_or_else(|_| Uri::from_static("/")),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            path_params: HashMap::new(),
            endpoint: None,
            session: Session::new(),
        }
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Sets the request ID.
    #[must_use]
    pub fn request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Sets the headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Replaces all path parameters.
    #[must_use]
    pub fn path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    /// Sets the matched endpoint name.
    #[must_use]
    pub fn endpoint(mut self, name: impl Into<String>) -> Self {
        self.endpoint = Some(name.into());
        self
    }

    /// Sets the session handle.
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext {
            request_id: self.request_id.unwrap_or_default(),
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            path_params: self.path_params,
            endpoint: self.endpoint,
            started_at: Instant::now(),
            session: self.session,
            user: None,
            extensions: HashMap::new(),
        }
    }
}

/// What AFTER middleware know about the request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Request ID.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Matched endpoint name.
    pub endpoint: Option<String>,
    /// When dispatch started.
    pub started_at: Instant,
    /// Session handle.
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(tenants: &[&str]) -> CurrentUser {
        CurrentUser {
            id: "u1".to_string(),
            email: None,
            display_name: None,
            tenant_ids: tenants.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_query_pairs_keep_order() {
        let ctx = RequestContext::builder(Method::GET, "/a?b=2&a=1&b=3").build();
        assert_eq!(
            ctx.query_pairs().unwrap(),
            vec![
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_keep_bad_escapes() {
        let ctx = RequestContext::builder(Method::GET, "/a?limit=%zz&flag").build();
        assert_eq!(
            ctx.query_pairs().unwrap(),
            vec![
                ("limit".to_string(), "%zz".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
        assert!(RequestContext::builder(Method::GET, "/a").build().query_pairs().unwrap().is_empty());
    }

    #[test]
    fn test_input_round_trip() {
        let mut ctx = RequestContext::builder(Method::POST, "/").build();
        ctx.set_input(42_u32);

        assert_eq!(ctx.input::<u32>(), Some(&42));
        assert!(ctx.take_input::<String>().is_err());
        assert_eq!(ctx.take_input::<u32>().unwrap(), 42);
        assert!(ctx.input::<u32>().is_none());
    }

    #[test]
    fn test_require_user() {
        let mut ctx = RequestContext::builder(Method::GET, "/").build();
        assert_eq!(ctx.require_user().unwrap_err().status_code().as_u16(), 401);

        ctx.set_user(member(&[]));
        assert_eq!(ctx.require_user().unwrap().id, "u1");
    }

    #[test]
    fn test_tenant_scope_requires_selected_tenant() {
        let mut ctx = RequestContext::builder(Method::GET, "/").build();
        ctx.set_user(member(&["t1"]));

        let err = ctx.tenant_scope().unwrap_err();
        assert_eq!(err.status_code().as_u16(), 403);
    }

    #[test]
    fn test_tenant_scope_requires_membership() {
        let session = Session::new();
        session.update(|data| data.current_tenant_id = Some("t2".to_string()));

        let mut ctx = RequestContext::builder(Method::GET, "/").session(session.clone()).build();
        ctx.set_user(member(&["t1"]));
        assert_eq!(ctx.tenant_scope().unwrap_err().status_code().as_u16(), 403);

        session.update(|data| data.current_tenant_id = Some("t1".to_string()));
        assert_eq!(ctx.tenant_scope().unwrap().tenant_id().as_str(), "t1");
    }

    #[test]
    fn test_meta_shares_session() {
        let ctx = RequestContext::builder(Method::DELETE, "/albums/1")
            .endpoint("deleteAlbum")
            .build();
        let meta = ctx.meta();

        ctx.session().update(|data| data.user_id = Some("u1".to_string()));
        assert_eq!(meta.session.user_id().as_deref(), Some("u1"));
        assert_eq!(meta.endpoint.as_deref(), Some("deleteAlbum"));
        assert_eq!(meta.path, "/albums/1");
    }
}
