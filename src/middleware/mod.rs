//! Server middleware
//!
//! Provides request logging.

pub mod logging;
