//! Storage operations
//!
//! Retrieve, store and delete entities that have already been resolved
//! by the validation module. All filesystem calls go through `tokio::fs`.

use log::{error, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use crate::error::StorageError;
use crate::storage::results::{DeleteResult, RetrieveResult, StoreResult};
use crate::storage::validation::EntityPath;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn is_missing(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Fails with `NotFound` unless `entity` names an existing regular file
async fn ensure_file(entity: &EntityPath) -> Result<(), StorageError> {
    match fs::metadata(&entity.real_path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(StorageError::NotFound(entity.name.clone())),
        Err(e) if is_missing(e.kind()) => Err(StorageError::NotFound(entity.name.clone())),
        Err(e) => Err(StorageError::from(e)),
    }
}

/// Reads the full contents of an entity, byte for byte
pub async fn retrieve_entity(entity: &EntityPath) -> Result<RetrieveResult, StorageError> {
    ensure_file(entity).await?;

    let contents = match fs::read(&entity.real_path).await {
        Ok(contents) => contents,
        Err(e) if is_missing(e.kind()) => return Err(StorageError::NotFound(entity.name.clone())),
        Err(e) => {
            error!(
                "Failed to read {} (real: {}): {}",
                entity.name,
                entity.real_path.display(),
                e
            );
            return Err(StorageError::from(e));
        }
    };

    info!("Retrieved {} ({} bytes)", entity.name, contents.len());

    Ok(RetrieveResult {
        file_path: entity.real_path.clone(),
        contents,
    })
}

/// Temporary sibling used while an upload is committed.
///
/// The name does not embed the target's, so it stays short however long
/// the target name is.
fn temp_path_for(entity: &EntityPath) -> PathBuf {
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{}.{}.tmp", std::process::id(), seq);

    match entity.real_path.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    }
}

async fn discard_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(
                "Failed to remove temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }
}

/// Creates or overwrites an entity with exactly `contents`.
///
/// Parent directories are created as needed. The data is written to a
/// temporary sibling first and renamed over the target, so a failed write
/// never leaves a partial entity behind. Concurrent writers race and the
/// last rename wins.
pub async fn store_entity(
    entity: &EntityPath,
    contents: &[u8],
) -> Result<StoreResult, StorageError> {
    let write_failed = |e: std::io::Error| {
        error!(
            "Failed to store {} (real: {}): {}",
            entity.name,
            entity.real_path.display(),
            e
        );
        StorageError::WriteFailed(entity.name.clone(), e)
    };

    if let Some(parent) = entity.real_path.parent() {
        fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let created = fs::metadata(&entity.real_path).await.is_err();
    let temp_path = temp_path_for(entity);

    if let Err(e) = fs::write(&temp_path, contents).await {
        discard_temp(&temp_path).await;
        return Err(write_failed(e));
    }

    if let Err(e) = fs::rename(&temp_path, &entity.real_path).await {
        discard_temp(&temp_path).await;
        return Err(write_failed(e));
    }

    info!(
        "Stored {} ({} bytes, {})",
        entity.name,
        contents.len(),
        if created { "created" } else { "overwritten" }
    );

    Ok(StoreResult {
        file_path: entity.real_path.clone(),
        bytes_written: contents.len(),
        created,
    })
}

/// Removes an entity
pub async fn delete_entity(entity: &EntityPath) -> Result<DeleteResult, StorageError> {
    ensure_file(entity).await?;

    match fs::remove_file(&entity.real_path).await {
        Ok(()) => {
            info!(
                "Deleted {} (real: {})",
                entity.name,
                entity.real_path.display()
            );
            Ok(DeleteResult {
                file_path: entity.real_path.clone(),
            })
        }
        Err(e) if is_missing(e.kind()) => Err(StorageError::NotFound(entity.name.clone())),
        Err(e) => {
            error!(
                "Failed to delete {} (real: {}): {}",
                entity.name,
                entity.real_path.display(),
                e
            );
            Err(StorageError::from(e))
        }
    }
}
