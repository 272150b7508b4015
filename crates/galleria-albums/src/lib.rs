//! # Galleria Albums
//!
//! Multi-tenant album management on top of the Galleria server stack.
//!
//! - [`dto`] declares the validated request payloads
//! - [`repository`] abstracts storage behind async traits, with in-memory
//!   implementations
//! - [`service::AlbumService`] applies the album rules inside a
//!   [`TenantScope`](galleria_core::TenantScope)
//! - [`auth`] loads the session user, guards pages and talks to the OIDC
//!   identity provider
//! - [`controllers`] describe the HTTP surface
//! - [`build_app`] wires everything into a [`galleria_server::App`]
//!
//! ## Example
//!
//! ```rust
//! use galleria_albums::{build_app, AppState};
//! use galleria_config::GalleriaConfig;
//!
//! let config = GalleriaConfig::default();
//! let state = AppState::in_memory(&config).unwrap();
//! let app = build_app(&config, state).unwrap();
//!
//! let openapi = app.context().openapi();
//! assert!(openapi.operation("get", "/api/v1/albums").is_some());
//! assert!(openapi.operation("get", "/auth/login").is_none());
//! ```

#![doc(html_root_url = "https://docs.rs/galleria-albums/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod auth;
pub mod controllers;
pub mod dto;
pub mod error;
pub mod model;
pub mod repository;
pub mod service;

pub use app::{build_app, AppState};
pub use dto::{
    AlbumStatus, CreateAlbum, ListAlbumsQuery, SortBy, SortDirection, SwitchTenant, UpdateAlbum,
};
pub use error::{IdentityError, RepositoryError, StartupError};
pub use model::{Album, StatusCounts, User};
pub use service::{AlbumPage, AlbumService};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
