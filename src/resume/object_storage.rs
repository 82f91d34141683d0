//! Blob storage for uploaded resume files.

use crate::error::{StorageError, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous object, and returns the key.
    fn put(&self, bytes: &[u8], key: &str) -> StorageResult<String>;

    /// Removes the object. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Stores objects as plain files below a base directory.
pub struct FsObjectStorage {
    base_dir: PathBuf,
}

impl FsObjectStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Maps a key to a path, refusing anything that could escape the base dir.
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let invalid = || StorageError::Fatal(format!("Invalid object key {:?}", key));

        if key.is_empty() || key.contains('\0') || key.contains('\\') {
            return Err(invalid());
        }
        if key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(invalid());
        }

        let relative = Path::new(key);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(invalid());
        }
        Ok(self.base_dir.join(relative))
    }
}

impl ObjectStorage for FsObjectStorage {
    fn put(&self, bytes: &[u8], key: &str) -> StorageResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!("Stored {} bytes at {}", bytes.len(), key);
        Ok(key.to_string())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
