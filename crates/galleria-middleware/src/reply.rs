//! Handler results before serialization.
//!
//! A [`Reply`] is what handlers, view renderers and short-circuiting
//! middleware produce. AFTER middleware may inspect and amend it; the dispatch
//! engine turns it into an HTTP [`Response`] as the final step.

use bytes::Bytes;
use galleria_core::Envelope;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde_json::{Map, Value};

use crate::types::Response;

/// JSON content type.
pub const APPLICATION_JSON: &str = "application/json";
/// HTML content type.
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Body of a [`Reply`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    /// Payload wrapped in the `{data, meta}` envelope at serialization time.
    Envelope {
        /// The payload.
        data: Value,
        /// Extra metadata merged next to `serverTime`.
        meta: Map<String, Value>,
    },
    /// JSON sent as-is, without the envelope.
    Json(Value),
    /// Rendered HTML.
    Html(String),
    /// Raw bytes with an explicit content type.
    Bytes {
        /// Content.
        content: Bytes,
        /// Content type.
        content_type: String,
    },
    /// No body.
    Empty,
}

/// A handler result awaiting serialization.
///
/// # Example
///
/// ```
/// use galleria_middleware::Reply;
/// use serde_json::json;
///
/// let reply = Reply::created(json!({"id": "a1"})).with_meta("source", json!("api"));
/// assert_eq!(reply.status().as_u16(), 201);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
}

impl Reply {
    /// Creates a reply from parts.
    #[must_use]
    pub fn new(status: StatusCode, body: ReplyBody) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// 200 with an enveloped JSON payload.
    #[must_use]
    pub fn json(data: Value) -> Self {
        Self::new(
            StatusCode::OK,
            ReplyBody::Envelope {
                data,
                meta: Map::new(),
            },
        )
    }

    /// 201 with an enveloped JSON payload.
    #[must_use]
    pub fn created(data: Value) -> Self {
        Self::json(data).with_status(StatusCode::CREATED)
    }

    /// 200 with JSON that bypasses the envelope.
    #[must_use]
    pub fn raw_json(value: Value) -> Self {
        Self::new(StatusCode::OK, ReplyBody::Json(value))
    }

    /// 200 with HTML.
    #[must_use]
    pub fn html(html: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, ReplyBody::Html(html.into()))
    }

    /// 200 with raw bytes.
    #[must_use]
    pub fn bytes(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self::new(
            StatusCode::OK,
            ReplyBody::Bytes {
                content: content.into(),
                content_type: content_type.into(),
            },
        )
    }

    /// 302 redirect to `location`.
    ///
    /// A location that is not a valid header value redirects to `/`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let value = HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
        let mut reply = Self::new(StatusCode::FOUND, ReplyBody::Empty);
        reply.headers.insert(LOCATION, value);
        reply
    }

    /// Replaces the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Adds an envelope `meta` entry. Ignored for non-envelope bodies.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        if let ReplyBody::Envelope { meta, .. } = &mut self.body {
            meta.insert(key.into(), value);
        }
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    /// Returns the body for modification.
    pub fn body_mut(&mut self) -> &mut ReplyBody {
        &mut self.body
    }

    /// Returns the redirect target, if this is a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        if self.status.is_redirection() {
            self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
        } else {
            None
        }
    }

    /// Serializes into an HTTP response.
    ///
    /// `content_type` overrides the body's natural content type when set.
    #[must_use]
    pub fn into_response(self, content_type: Option<&HeaderValue>) -> Response {
        let (natural, bytes) = match self.body {
            ReplyBody::Envelope { data, meta } => {
                let envelope = Envelope::new(data).with_meta(meta);
                (
                    Some(HeaderValue::from_static(APPLICATION_JSON)),
                    Bytes::from(serde_json::to_vec(&envelope).unwrap_or_default()),
                )
            }
            ReplyBody::Json(value) => (
                Some(HeaderValue::from_static(APPLICATION_JSON)),
                Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
            ),
            ReplyBody::Html(html) => (Some(HeaderValue::from_static(TEXT_HTML)), Bytes::from(html)),
            ReplyBody::Bytes {
                content,
                content_type,
            } => (HeaderValue::from_str(&content_type).ok(), content),
            ReplyBody::Empty => (None, Bytes::new()),
        };

        let mut response = http::Response::new(Full::new(bytes));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if let Some(value) = content_type.cloned().or(natural) {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }

        response
    }
}
