//! Root directory handle
//!
//! `FileStore` owns the canonical root path and is the only way request
//! handlers reach the filesystem.

use log::info;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::StorageError;
use crate::storage::operations::{delete_entity, retrieve_entity, store_entity};
use crate::storage::results::{DeleteResult, RetrieveResult, StoreResult};
use crate::storage::validation::{EntityPath, resolve_entity_path};

/// Entity store confined to a single root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create the root directory if absent and pin its canonical path
    pub async fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).await?;
        let root = fs::canonicalize(root).await?;
        info!("Server root directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-supplied name to a path beneath the root
    pub fn resolve(&self, name: Option<&str>) -> Result<EntityPath, StorageError> {
        resolve_entity_path(&self.root, name)
    }

    pub async fn retrieve(&self, entity: &EntityPath) -> Result<RetrieveResult, StorageError> {
        retrieve_entity(entity).await
    }

    pub async fn store(
        &self,
        entity: &EntityPath,
        contents: &[u8],
    ) -> Result<StoreResult, StorageError> {
        store_entity(entity, contents).await
    }

    pub async fn delete(&self, entity: &EntityPath) -> Result<DeleteResult, StorageError> {
        delete_entity(entity).await
    }
}
