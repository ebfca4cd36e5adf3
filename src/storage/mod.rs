//! Durable storage collaborators.
//!
//! The pipeline persists three small values: the pending batch bytes, the
//! installation id and the user preferences. Storage is reached through the
//! asynchronous [`Storage`] trait so the pipeline never blocks on it.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Storage`] | Async key-value capability (overwrite-with-latest) |
//! | [`StorageKey`] | The closed set of persisted keys |
//! | [`FileStorage`] | One file per key under a directory |
//! | [`MemoryStorage`] | In-process map, for tests and memory-only runs |
//! | [`HistoryLog`] | Append-only plaintext event log |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// File-backed key-value storage.
pub mod file;

/// Append-only history log.
pub mod log;

/// In-memory key-value storage.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use file::FileStorage;
pub use log::{HistoryLog, LogEntry};
pub use memory::MemoryStorage;

// ============================================================================
// StorageKey
// ============================================================================

/// Persisted state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Pending (not yet flushed) batch bytes.
    PendingBatch,
    /// Installation identifier string.
    InstallationId,
    /// User preferences as JSON.
    Preferences,
}

impl StorageKey {
    /// Returns the key name used on disk.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingBatch => "tempRecords",
            Self::InstallationId => "ID",
            Self::Preferences => "preferences",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Asynchronous durable key-value storage.
///
/// Writes replace the previous value. Implementations report a storage that
/// is not ready with [`Error::StorageUnavailable`](crate::Error::StorageUnavailable).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Loads the value under `key`, or `None` if nothing is stored.
    async fn load(&self, key: StorageKey) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn store(&self, key: StorageKey, value: &[u8]) -> Result<()>;

    /// Removes the value under `key`. Removing a missing key succeeds.
    async fn remove(&self, key: StorageKey) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
