//! # Galleria Docs
//!
//! API documentation for Galleria services.
//!
//! This crate provides:
//! - **OpenAPI 3.1 types** ([`OpenApi`] and friends)
//! - **Schemas** ([`Schema`], and the [`ApiSchema`] trait DTOs implement)
//! - **Generation** from registered endpoints ([`OpenApiGenerator`])
//! - **RapiDoc** page generation ([`RapiDoc`])
//!
//! ## Quick Start
//!
//! ```
//! use galleria_docs::{OpenApiGenerator, OperationSpec, RapiDoc};
//! use http::Method;
//!
//! let doc = OpenApiGenerator::new()
//!     .title("Galleria")
//!     .version("1.0.0")
//!     .generate(&[OperationSpec::new(Method::GET, "/api/v1/albums", "listAlbums")])
//!     .unwrap();
//! assert_eq!(doc.operation_count(), 1);
//!
//! let page = RapiDoc::new("Galleria API").html();
//! assert!(page.contains("rapi-doc"));
//! ```

mod error;
mod generator;
mod openapi;
mod rapidoc;
mod schema;

pub use error::{DocsError, DocsResult};
pub use generator::{envelope_schema, error_schema, OpenApiGenerator, OperationSpec};
pub use openapi::{
    Components, Info, MediaType, OpenApi, Operation, Parameter, ParameterIn, PathItem,
    RequestBody, Response, Server, Tag,
};
pub use rapidoc::{RapiDoc, RapiDocTheme, RenderStyle, DEFAULT_SCRIPT_URL, DEFAULT_SPEC_URL};
pub use schema::{ApiSchema, Schema, SchemaType};
