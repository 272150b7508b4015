//! Built-in middleware units.
//!
//! - [`request_id`] - echo the request ID as `X-Request-ID`

pub mod request_id;

pub use request_id::{request_id, REQUEST_ID_HEADER};
