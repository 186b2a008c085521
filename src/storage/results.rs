//! Storage result types
//!
//! Defines result structures returned by storage operations.

use std::path::PathBuf;

/// Result of an entity retrieval operation
#[derive(Debug, Clone)]
pub struct RetrieveResult {
    pub file_path: PathBuf,
    pub contents: Vec<u8>,
}

/// Result of an entity store operation
#[derive(Debug, Clone)]
pub struct StoreResult {
    pub file_path: PathBuf,
    pub bytes_written: usize,
    /// False when an existing entity was overwritten
    pub created: bool,
}

/// Result of an entity deletion operation
#[derive(Debug, Clone)]
pub struct DeleteResult {
    pub file_path: PathBuf,
}
