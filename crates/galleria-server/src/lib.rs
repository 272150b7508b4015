//! # Galleria Server
//!
//! Declarative endpoints, the dispatch engine and the HTTP server.
//!
//! - [`endpoint`] / [`controller`] describe routes without doing any I/O
//! - [`App::builder`] runs the single registration pass and produces an
//!   immutable [`ServerContext`]
//! - [`App::handle`] runs one request through the state machine
//! - [`Server`] binds a socket and serves an [`App`] until stopped
//! - [`HealthRegistry`] backs `/healthz` and `/readyz`
//!
//! ## Example
//!
//! ```rust
//! use galleria_core::ApiError;
//! use galleria_server::{controller, endpoint, App};
//! use http::Method;
//! use serde_json::json;
//!
//! let app = App::builder()
//!     .title("Galleria")
//!     .controller(
//!         controller("/api/v1/albums")
//!             .tag("Albums")
//!             .endpoints(vec![endpoint(Method::GET, "/", "listAlbums")
//!                 .handler(|_ctx| async move { Ok::<_, ApiError>(json!([])) })]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(app.context().openapi().operation("get", "/api/v1/albums").is_some());
//! ```

#![doc(html_root_url = "https://docs.rs/galleria-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod config;
mod controller;
mod dispatch;
mod endpoint;
mod error;
mod health;
mod meta;
mod router;
mod server;
mod shutdown;
mod views;

pub use app::{App, AppBuilder, RouteEntry, ServerContext, DEFAULT_ASSETS_DIR};
pub use config::{ServerConfig, ServerConfigBuilder, DEFAULT_HTTP_ADDR, DEFAULT_SHUTDOWN_TIMEOUT_SECS};
pub use controller::{controller, Controller, ControllerBuilder};
pub use endpoint::{
    endpoint, Endpoint, EndpointBuilder, InputSpec, JsonHandlerFn, RawHandlerFn, Target, ViewDataFn,
};
pub use error::{ConfigError, ServerError};
pub use health::{sync_check, HealthHook, HealthRegistry};
pub use meta::RAPIDOC_SCRIPT;
pub use router::{join_paths, normalize_template, RouteError, RouteMatch, Router};
pub use server::Server;
pub use shutdown::{os_signal, ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use views::{MiniJinjaRenderer, TemplateRenderer, ViewError};
