//! Client connection handling
//!
//! Runs the request loop for a single accepted connection.

pub mod handler;

pub use handler::handle_client;
