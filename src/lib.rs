//! RAX file store
//!
//! A small HTTP service that reads, writes and deletes text files beneath
//! a single root directory, refusing any name that would escape it.

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod storage;

pub use config::ServerConfig;
pub use server::Server;
pub use storage::FileStore;
