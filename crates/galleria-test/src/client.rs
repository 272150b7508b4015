//! Test client for in-memory requests.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use galleria_server::App;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Method};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Cookies remembered between requests.
///
/// Stores `name=value` pairs from `Set-Cookie`; a cookie with `Max-Age=0`
/// or an empty value is removed. Attributes other than `Max-Age` are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Arc<Mutex<BTreeMap<String, String>>>,
}

impl CookieJar {
    /// Returns the stored value of `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    /// Stores a cookie.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.lock().insert(name.into(), value.into());
    }

    /// Forgets every cookie.
    pub fn clear(&self) {
        self.cookies.lock().clear();
    }

    /// Returns the number of stored cookies.
    pub fn len(&self) -> usize {
        self.cookies.lock().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.cookies.lock().is_empty()
    }

    fn header_value(&self) -> Option<HeaderValue> {
        let cookies = self.cookies.lock();
        if cookies.is_empty() {
            return None;
        }
        let joined = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }

    fn store(&self, headers: &HeaderMap) {
        let mut cookies = self.cookies.lock();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let mut attributes = value.split(';').map(str::trim);
            let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let expired = attributes.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));

            if expired || value.is_empty() {
                cookies.remove(name);
            } else {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
    }
}

/// A browser-like client over an [`App`].
///
/// Requests run through [`App::handle`]; `Set-Cookie` responses update the
/// client's [`CookieJar`] and later requests send the stored cookies back.
#[must_use]
#[derive(Clone)]
pub struct TestClient {
    app: App,
    jar: CookieJar,
    default_headers: Vec<(String, String)>,
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("jar", &self.jar)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl TestClient {
    /// Creates a client with an empty cookie jar.
    pub fn new(app: App) -> Self {
        Self {
            app,
            jar: CookieJar::default(),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns a second client over the same app with its own, empty jar.
    pub fn fresh_session(&self) -> Self {
        Self {
            app: self.app.clone(),
            jar: CookieJar::default(),
            default_headers: self.default_headers.clone(),
        }
    }

    /// Returns the application.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Returns the cookie jar.
    pub fn cookies(&self) -> &CookieJar {
        &self.jar
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    /// Dispatches a built request.
    pub async fn execute(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let mut request = request.into_http_request();
        if !request.headers().contains_key(COOKIE) {
            if let Some(cookie) = self.jar.header_value() {
                request.headers_mut().insert(COOKIE, cookie);
            }
        }

        let response = TestResponse::from_http(self.app.handle(request).await).await?;
        self.jar.store(response.headers());
        Ok(response)
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form body.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Appends query pairs.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read;
    /// use [`try_send`](Self::try_send) to handle those.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(err) => panic!("test request failed: {err}"),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::ApiError;
    use galleria_middleware::{MiddlewareUnit, Reply};
    use galleria_server::{controller, endpoint};
    use serde_json::json;

    fn app() -> App {
        App::builder()
            .controller(controller("/").endpoints(vec![
                endpoint(Method::GET, "/echo", "echo").handler(|ctx| async move {
                    Ok::<_, ApiError>(json!({
                        "method": ctx.method().as_str(),
                        "query": ctx.query_pairs()?,
                        "client": ctx.headers().get("x-client").and_then(|v| v.to_str().ok()),
                    }))
                }),
                endpoint(Method::POST, "/remember", "remember").handler(|ctx| async move {
                    ctx.session().update(|data| data.user_id = Some("u-1".to_string()));
                    Ok::<_, ApiError>(json!({"ok": true}))
                }),
                endpoint(Method::GET, "/whoami", "whoami").handler(|ctx| async move {
                    Ok::<_, ApiError>(json!({"userId": ctx.session().user_id()}))
                }),
                endpoint(Method::POST, "/forget", "forget").handler(|ctx| async move {
                    ctx.session().destroy();
                    Ok::<_, ApiError>(json!({"ok": true}))
                }),
            ]))
            .middleware(MiddlewareUnit::after("stamp", |_meta, reply: Reply| async move {
                Ok(reply.with_header(
                    http::header::HeaderName::from_static("x-test"),
                    HeaderValue::from_static("1"),
                ))
            }))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_dispatches_through_app() {
        let client = TestClient::new(app());
        let response = client.get("/echo").query(&[("a", "1")]).send().await;

        response.assert_status_code(200).assert_header("x-test", "1");
        let data = response.data().unwrap();
        assert_eq!(data["method"], "GET");
        assert!(response.meta().unwrap()["serverTime"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let client = TestClient::new(app());
        let response = client.get("/nope").send().await;
        response.assert_status_code(404);
        assert_eq!(response.error_message().unwrap(), "Not found");
    }

    #[tokio::test]
    async fn test_cookie_jar_carries_session() {
        let client = TestClient::new(app());
        assert!(client.cookies().is_empty());

        client.post("/remember").send().await.assert_status_code(200);
        assert!(client.cookies().get("galleria.sid").is_some());

        let whoami = client.get("/whoami").send().await;
        assert_eq!(whoami.data().unwrap()["userId"], "u-1");

        let other = client.fresh_session();
        let anonymous = other.get("/whoami").send().await;
        assert!(anonymous.data().unwrap()["userId"].is_null());
    }

    #[tokio::test]
    async fn test_destroyed_session_clears_cookie() {
        let client = TestClient::new(app());
        client.post("/remember").send().await;
        assert_eq!(client.cookies().len(), 1);

        client.post("/forget").send().await.assert_status_code(200);
        assert!(client.cookies().is_empty());

        let whoami = client.get("/whoami").send().await;
        assert!(whoami.data().unwrap()["userId"].is_null());
    }

    #[tokio::test]
    async fn test_default_headers() {
        let client = TestClient::new(app()).with_default_header("x-client", "suite");
        let response = client.get("/echo").send().await;
        assert_eq!(response.data().unwrap()["client"], "suite");
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let client = TestClient::new(app());
        let result = client.get("/echo").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}
