//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A collected response with helpers for envelope-shaped bodies.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}

impl TestResponse {
    /// Collects an HTTP response.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self::new(parts.status, parts.headers, body))
    }

    /// Creates a response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true for 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true for 3xx.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the Location header value.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION.as_str())
    }

    /// Returns every `Set-Cookie` value.
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the whole body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserializes the body as a JSON value.
    pub fn json_value(&self) -> Result<Value, TestError> {
        self.json()
    }

    /// Returns the envelope's `data`.
    pub fn data(&self) -> Result<Value, TestError> {
        self.envelope_field("data")
    }

    /// Deserializes the envelope's `data`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_value(self.data()?)?)
    }

    /// Returns the envelope's `meta`.
    pub fn meta(&self) -> Result<Value, TestError> {
        self.envelope_field("meta")
    }

    /// Returns the error body's `error` object.
    pub fn error(&self) -> Result<Value, TestError> {
        self.envelope_field("error")
    }

    /// Returns `error.message`.
    pub fn error_message(&self) -> Result<String, TestError> {
        self.error()?
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TestError::UnexpectedResponse("error.message missing".to_string()))
    }

    fn envelope_field(&self, field: &str) -> Result<Value, TestError> {
        let mut body = self.json_value()?;
        body.get_mut(field).map(Value::take).ok_or_else(|| {
            TestError::UnexpectedResponse(format!(
                "no '{field}' in body: {}",
                String::from_utf8_lossy(&self.body)
            ))
        })
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}; body: {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts the status code as a u16.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {}, got {}; body: {}",
            expected,
            self.status.as_u16(),
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or different.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let actual = self.header_str(name);
        assert_eq!(
            actual,
            Some(expected.as_ref()),
            "Header '{name}' mismatch"
        );
        self
    }

    /// Asserts a redirect to `location`.
    ///
    /// # Panics
    ///
    /// Panics if the response is not a redirect to `location`.
    pub fn assert_redirect(&self, location: impl AsRef<str>) -> &Self {
        assert!(
            self.is_redirect(),
            "Expected redirect, got {}",
            self.status
        );
        assert_eq!(self.location(), Some(location.as_ref()), "Location mismatch");
        self
    }

    /// Asserts that the body contains `expected`.
    ///
    /// # Panics
    ///
    /// Panics if it does not.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected.as_ref()),
            "Body does not contain '{}': {body}",
            expected.as_ref()
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_response(status: StatusCode, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        TestResponse::new(status, headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_envelope_accessors() {
        let response = json_response(
            StatusCode::OK,
            r#"{"data":{"id":"1"},"meta":{"serverTime":"2024-01-01T00:00:00Z"}}"#,
        );

        assert_eq!(response.data().unwrap()["id"], "1");
        assert_eq!(response.meta().unwrap()["serverTime"], "2024-01-01T00:00:00Z");
        assert!(matches!(response.error(), Err(TestError::UnexpectedResponse(_))));
    }

    #[test]
    fn test_data_as() {
        let response = json_response(StatusCode::OK, r#"{"data":[1,2,3],"meta":{}}"#);
        let numbers: Vec<u32> = response.data_as().unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_error_message() {
        let response = json_response(StatusCode::NOT_FOUND, r#"{"error":{"message":"Not found"}}"#);
        response.assert_status_code(404);
        assert_eq!(response.error_message().unwrap(), "Not found");
    }

    #[test]
    fn test_redirect_and_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("/auth/login"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2; Path=/"));
        let response = TestResponse::new(StatusCode::FOUND, headers, Bytes::new());

        response.assert_redirect("/auth/login");
        assert_eq!(response.set_cookies(), vec!["a=1; Path=/", "b=2; Path=/"]);
    }

    #[test]
    fn test_text_invalid_utf8() {
        let response = TestResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(&[0xff]));
        assert!(matches!(response.text(), Err(TestError::BodyRead(_))));
    }

    #[test]
    #[should_panic(expected = "Expected status 200")]
    fn test_assert_status_panics() {
        json_response(StatusCode::BAD_REQUEST, "{}").assert_status(StatusCode::OK);
    }
}
