//! File-backed key-value storage.
//!
//! Each key is one file under the storage directory. Writes go to a
//! temporary sibling first and are renamed into place, so a crash never
//! leaves a half-written batch behind.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{Storage, StorageKey};

// ============================================================================
// FileStorage
// ============================================================================

/// Storage that keeps one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        debug!(root = %root.display(), "File storage opened");
        Ok(Self { root })
    }

    /// Returns the storage directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: StorageKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, key: StorageKey) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => {
                trace!(%key, len = bytes.len(), "Loaded value");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(key.as_str(), e.to_string())),
        }
    }

    async fn store(&self, key: StorageKey, value: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");

        fs::write(&tmp, value)
            .await
            .map_err(|e| Error::storage(key.as_str(), e.to_string()))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::storage(key.as_str(), e.to_string()))?;

        trace!(%key, len = value.len(), "Stored value");
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(key.as_str(), e.to_string())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
