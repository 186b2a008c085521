//! Logging middleware
//!
//! Provides connection and access logging.

use http::{Method, StatusCode};
use log::{debug, info};
use std::net::SocketAddr;
use std::time::Duration;

/// Log a client connection
pub fn log_connection(client_addr: SocketAddr) {
    debug!("Client connected: {}", client_addr);
}

/// Log a completed request
pub fn log_request(
    client_addr: SocketAddr,
    method: &Method,
    target: &str,
    status: StatusCode,
    elapsed: Duration,
) {
    info!(
        "{} {} {} -> {} ({:.2?})",
        client_addr,
        method,
        target,
        status.as_u16(),
        elapsed
    );
}
