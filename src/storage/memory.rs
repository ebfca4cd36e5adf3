//! In-memory key-value storage.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

use super::{Storage, StorageKey};

// ============================================================================
// MemoryStorage
// ============================================================================

/// Storage backed by a map in process memory.
///
/// Nothing survives a restart. Can be switched to unavailable to exercise
/// the pipeline's degraded mode.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<FxHashMap<StorageKey, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the storage as not ready (or ready again).
    ///
    /// While unavailable every operation fails with
    /// [`Error::StorageUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns a copy of the stored value without going through the trait.
    #[must_use]
    pub fn get(&self, key: StorageKey) -> Option<Vec<u8>> {
        self.values.lock().get(&key).cloned()
    }

    fn check_ready(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: StorageKey) -> Result<Option<Vec<u8>>> {
        self.check_ready()?;
        Ok(self.get(key))
    }

    async fn store(&self, key: StorageKey, value: &[u8]) -> Result<()> {
        self.check_ready()?;
        self.values.lock().insert(key, value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> Result<()> {
        self.check_ready()?;
        self.values.lock().remove(&key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
