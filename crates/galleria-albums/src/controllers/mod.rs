//! Route descriptions for the album app.

pub mod albums;
pub mod auth;
pub mod views;

pub use auth::{local_redirect, DEFAULT_LANDING};
