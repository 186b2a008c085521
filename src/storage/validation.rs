//! Path validation
//!
//! Maps client-supplied entity names onto real paths beneath the root.
//! Resolution is purely lexical: nothing here touches the filesystem.

use log::warn;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// An entity name that has been resolved and confined to the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    /// Absolute path on disk, always a proper descendant of the root
    pub real_path: PathBuf,
    /// Path relative to the root, used for logging
    pub name: String,
}

/// Resolve `name` against `root`, failing if the result would escape it.
///
/// `root` is expected to be absolute and already normalized (the store
/// canonicalizes it once at startup). Names carrying a `..` segment or an
/// absolute prefix are rejected outright; everything else is joined,
/// normalized and must still have the root as a proper component prefix.
pub fn resolve_entity_path(root: &Path, name: Option<&str>) -> Result<EntityPath, StorageError> {
    let name = match name {
        Some(n) if !n.is_empty() => n,
        _ => return Err(StorageError::MissingName),
    };

    if name.contains('\0') {
        warn!("Rejected filename containing NUL byte: {:?}", name);
        return Err(StorageError::InvalidName(name.to_string()));
    }

    let escapes = Path::new(name).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        warn!("Rejected filename with traversal or absolute prefix: {:?}", name);
        return Err(StorageError::InvalidName(name.to_string()));
    }

    let resolved = normalize_path(&root.join(name));

    // Path::starts_with compares whole components, so "/srv/files2" never
    // matches a root of "/srv/files".
    if resolved == root || !resolved.starts_with(root) {
        warn!(
            "Rejected filename {:?}: resolves to {} outside {}",
            name,
            resolved.display(),
            root.display()
        );
        return Err(StorageError::InvalidName(name.to_string()));
    }

    let relative = resolved
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| name.to_string());

    Ok(EntityPath {
        real_path: resolved,
        name: relative,
    })
}

/// Collapse `.` and `..` components without consulting the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}
