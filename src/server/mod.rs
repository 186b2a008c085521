//! Server core functionality
//!
//! This module contains the listener, accept loop and startup sequence.

pub mod core;

pub use self::core::Server;
