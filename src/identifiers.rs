//! Type-safe identifiers.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TabId`] | Browser tab id within the current session |
//! | [`InstallationId`] | Random per-install pseudonym source |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::{Storage, StorageKey};

// ============================================================================
// TabId
// ============================================================================

/// Browser tab identifier.
///
/// Unlike the record fields it feeds, a `TabId` is never range checked:
/// ids too wide for a wire format are saturated when encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TabId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// InstallationId
// ============================================================================

/// Random identifier of one install.
///
/// Generated once from 128 bits of OS randomness, persisted, and reloaded on
/// every start. Only its SHA-256 [`pseudonym`](Self::pseudonym) ever leaves
/// the device.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InstallationId(String);

impl InstallationId {
    /// Generates a fresh identifier rendered as a dash-separated hex string.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(Uuid::from_bytes(bytes).hyphenated().to_string())
    }

    /// Wraps an already known identifier string.
    #[inline]
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Loads the persisted identifier, or generates and persists a new one.
    ///
    /// A persisted value is never regenerated. If storage is not available
    /// the identifier is still returned; storage errors are logged.
    pub async fn get_or_create(storage: &dyn Storage) -> Self {
        Self::load_or_generate(storage).await.0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// storage now holds the returned identifier.
    pub(crate) async fn load_or_generate(storage: &dyn Storage) -> (Self, bool) {
        match storage.load(StorageKey::InstallationId).await {
            Ok(Some(bytes)) => {
                let id = String::from_utf8_lossy(&bytes).trim().to_string();
                if !id.is_empty() {
                    debug!("Found installation id");
                    return (Self(id), true);
                }
                warn!("Persisted installation id is empty, regenerating");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Storage not ready, installation id not persisted yet");
                return (Self::generate(), false);
            }
        }

        let id = Self::generate();
        match id.store(storage).await {
            Ok(()) => {
                info!("Generated installation id");
                (id, true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist installation id");
                (id, false)
            }
        }
    }

    /// Stores this identifier unless storage already holds one.
    ///
    /// An identifier already in storage is left alone; it is picked up on
    /// the next start.
    ///
    /// # Errors
    ///
    /// Returns storage errors from the read or the write.
    pub async fn persist_if_absent(&self, storage: &dyn Storage) -> Result<()> {
        if let Some(bytes) = storage.load(StorageKey::InstallationId).await? {
            let stored = String::from_utf8_lossy(&bytes);
            let stored = stored.trim();
            if !stored.is_empty() {
                if stored != self.0 {
                    warn!("Storage holds a different installation id, keeping it for the next start");
                }
                return Ok(());
            }
        }

        self.store(storage).await?;
        info!("Installation id persisted");
        Ok(())
    }

    async fn store(&self, storage: &dyn Storage) -> Result<()> {
        storage
            .store(StorageKey::InstallationId, self.0.as_bytes())
            .await
    }

    /// Returns the raw identifier string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lowercase hex SHA-256 of the identifier.
    ///
    /// This is the only form sent to the collector.
    #[must_use]
    pub fn pseudonym(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The raw id stays out of logs.
        f.debug_tuple("InstallationId").field(&"..").finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::MemoryStorage;

    #[test]
    fn test_tab_id_display() {
        assert_eq!(TabId::new(42).to_string(), "42");
        assert_eq!(TabId::from(7).get(), 7);
    }

    #[test]
    fn test_generate_format() {
        let id = InstallationId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();

        let lens: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        assert_eq!(lens, vec![8, 4, 4, 4, 12]);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(InstallationId::generate(), InstallationId::generate());
    }

    #[test]
    fn test_pseudonym_is_sha256_hex() {
        let id = InstallationId::from_string("abc");
        assert_eq!(
            id.pseudonym(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_debug_hides_raw_id() {
        let id = InstallationId::from_string("secret-id");
        assert!(!format!("{id:?}").contains("secret-id"));
    }

    #[tokio::test]
    async fn test_get_or_create_persists_once() {
        let storage = MemoryStorage::new();

        let first = InstallationId::get_or_create(&storage).await;
        let second = InstallationId::get_or_create(&storage).await;

        assert_eq!(first, second);
        assert_eq!(
            storage.get(StorageKey::InstallationId),
            Some(first.as_str().as_bytes().to_vec())
        );
    }

    #[tokio::test]
    async fn test_get_or_create_loads_existing() {
        let storage = MemoryStorage::new();
        storage
            .store(StorageKey::InstallationId, b"0000-1111\n")
            .await
            .unwrap();

        let id = InstallationId::get_or_create(&storage).await;
        assert_eq!(id.as_str(), "0000-1111");
    }

    #[tokio::test]
    async fn test_get_or_create_without_storage() {
        let storage = MemoryStorage::new();
        storage.set_unavailable(true);

        let id = InstallationId::get_or_create(&storage).await;
        assert_eq!(id.as_str().len(), 36);
        assert!(storage.get(StorageKey::InstallationId).is_none());
    }

    #[tokio::test]
    async fn test_persist_if_absent_after_storage_returns() {
        let storage = MemoryStorage::new();
        storage.set_unavailable(true);

        let (id, persisted) = InstallationId::load_or_generate(&storage).await;
        assert!(!persisted);
        assert!(id.persist_if_absent(&storage).await.is_err());

        storage.set_unavailable(false);
        id.persist_if_absent(&storage).await.unwrap();
        assert_eq!(
            storage.get(StorageKey::InstallationId),
            Some(id.as_str().as_bytes().to_vec())
        );
        assert_eq!(InstallationId::get_or_create(&storage).await, id);
    }

    #[tokio::test]
    async fn test_persist_if_absent_keeps_stored_id() {
        let storage = MemoryStorage::new();
        storage
            .store(StorageKey::InstallationId, b"stored-id")
            .await
            .unwrap();

        InstallationId::from_string("other-id")
            .persist_if_absent(&storage)
            .await
            .unwrap();
        assert_eq!(
            storage.get(StorageKey::InstallationId),
            Some(b"stored-id".to_vec())
        );
    }
}
