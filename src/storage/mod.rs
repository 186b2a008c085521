//! File system storage management
//!
//! Handles entity operations and path validation beneath the root directory.

pub mod filesystem;
pub mod operations;
pub mod results;
pub mod validation;

pub use filesystem::FileStore;
pub use results::{DeleteResult, RetrieveResult, StoreResult};
pub use validation::{EntityPath, resolve_entity_path};
