//! Request ID propagation.
//!
//! The dispatch engine assigns every request a [`RequestId`], reusing a
//! valid incoming `X-Request-ID` header when present. This AFTER unit echoes
//! the ID back so clients can correlate their requests with server logs.
//!
//! [`RequestId`]: galleria_core::RequestId

use http::{HeaderName, HeaderValue};

use crate::middleware::MiddlewareUnit;
use crate::reply::Reply;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Name under which the unit is registered.
pub const NAME: &str = "request_id";

/// Creates the AFTER unit that sets `X-Request-ID` on every reply.
#[must_use]
pub fn request_id() -> MiddlewareUnit {
    MiddlewareUnit::after(NAME, |meta, reply: Reply| async move {
        let value = HeaderValue::from_str(&meta.request_id.to_string())
            .map_err(|e| galleria_core::ApiError::internal_with_source("invalid request id", e))?;
        let mut reply = reply;
        reply
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        Ok(reply)
    })
}
