//! HTTP protocol implementation
//!
//! Handles request parsing, body reception, routing and response encoding.

pub mod body;
pub mod handlers;
pub mod parser;
pub mod responses;
pub mod router;

pub use body::{Body, BodyKind};
pub use handlers::{Outcome, error_response, handle_request};
pub use parser::{RequestHead, RequestLimits, read_request_head};
pub use responses::Response;
