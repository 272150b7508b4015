//! Common types used throughout the middleware chain.

use bytes::Bytes;
use http_body_util::Full;
use std::future::Future;
use std::pin::Pin;

/// The HTTP request type handed to the dispatch engine.
///
/// This is a standard `http::Request` with a fully buffered `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced by the dispatch engine.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
