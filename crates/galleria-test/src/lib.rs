//! # Galleria Test
//!
//! Drives a built [`App`](galleria_server::App) in memory: no socket, the
//! full dispatch engine (routing, middleware, validation, sessions) runs for
//! every request.
//!
//! [`TestClient`] keeps a cookie jar, so a login round trip followed by an
//! authenticated request behaves like a browser.
//!
//! ## Example
//!
//! ```rust
//! use galleria_core::ApiError;
//! use galleria_server::{controller, endpoint, App};
//! use galleria_test::TestClient;
//! use http::Method;
//!
//! # tokio_test::block_on(async {
//! let app = App::builder()
//!     .controller(controller("/api").endpoints(vec![
//!         endpoint(Method::GET, "/ping", "ping")
//!             .handler(|_ctx| async move { Ok::<_, ApiError>("pong") }),
//!     ]))
//!     .build()
//!     .unwrap();
//!
//! let client = TestClient::new(app);
//! let response = client.get("/api/ping").send().await;
//!
//! response.assert_status_code(200);
//! assert_eq!(response.data().unwrap(), "pong");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/galleria-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{CookieJar, TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
