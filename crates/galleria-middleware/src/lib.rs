//! # Galleria Middleware
//!
//! Request-scoped building blocks used by the Galleria dispatch engine.
//!
//! ## Request Flow
//!
//! ```text
//! Request ─► BEFORE units ─► input validation ─► handler ─► AFTER units ─► Reply ─► Response
//!               │                                              ▲
//!               └────────── Flow::Respond(reply) ──────────────┘
//! ```
//!
//! - [`RequestContext`] travels by value through BEFORE units into the handler
//! - [`MiddlewareUnit`] is a named BEFORE or AFTER step
//! - [`MiddlewareChain`] is the deduplicated chain of one endpoint
//! - [`Reply`] is the handler result awaiting serialization
//! - [`Session`] / [`SessionManager`] keep per-browser state behind a cookie
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use galleria_middleware::{Flow, MiddlewareChain, MiddlewareUnit, Reply};
//!
//! let guard = MiddlewareUnit::before("guard", |ctx| async move {
//!     if ctx.user().is_none() {
//!         return Ok(Flow::Respond(Reply::redirect("/auth/login")));
//!     }
//!     Ok(Flow::Continue(ctx))
//! });
//!
//! let chain = MiddlewareChain::compose(&[&[Arc::new(guard)]]);
//! assert_eq!(chain.names(), vec!["guard"]);
//! ```

#![doc(html_root_url = "https://docs.rs/galleria-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod cookie;
pub mod middleware;
pub mod reply;
pub mod session;
pub mod stages;
pub mod types;

pub use chain::MiddlewareChain;
pub use context::{RequestContext, RequestContextBuilder, RequestMeta};
pub use middleware::{
    AfterFn, BeforeFn, Flow, MiddlewareError, MiddlewareKind, MiddlewareRegistry, MiddlewareUnit,
};
pub use reply::{Reply, ReplyBody, APPLICATION_JSON, TEXT_HTML};
pub use session::{
    MemorySessionStore, Session, SessionConfig, SessionData, SessionError, SessionId,
    SessionManager, SessionStore,
};
pub use types::{BoxFuture, Request, Response};
