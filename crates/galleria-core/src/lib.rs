//! # Galleria Core
//!
//! Core types shared by every Galleria crate:
//!
//! - [`ApiError`] - Status-bearing error taxonomy and the `{error: ...}` body
//! - [`validate`] / [`Dto`] - Raw input to validated, typed DTOs
//! - [`Envelope`] - The `{data, meta}` success envelope
//! - [`RequestId`] - UUID v7 request identifier
//! - [`CurrentUser`] / [`TenantScope`] - Authenticated user and tenant scoping

#![doc(html_root_url = "https://docs.rs/galleria-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod envelope;
mod error;
mod identity;
pub mod validation;

pub use context::RequestId;
pub use envelope::Envelope;
pub use error::{ApiError, ApiResult, ErrorBody, ErrorEnvelope, ErrorKind, GENERIC_INTERNAL_MESSAGE};
pub use identity::{CurrentUser, TenantId, TenantScope};
pub use validation::{coerce, validate, Dto, ValidationFailure, ValidationIssue};
