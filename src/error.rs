//! Error types for the tab logger.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tablog::{Result, Error};
//!
//! async fn example(pipeline: &mut Pipeline) -> Result<()> {
//!     pipeline.record(TabId::new(7), EventKind::Created, false).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Codec | [`Error::InvalidRecordLength`], [`Error::UnknownEventTag`] |
//! | Storage | [`Error::Storage`], [`Error::StorageUnavailable`] |
//! | Transmission | [`Error::Encryption`], [`Error::CollectorStatus`], [`Error::Http`] |
//! | Pipeline | [`Error::PipelineClosed`] |
//! | External | [`Error::Io`], [`Error::Json`] |
//!
//! Field saturation and a missing send consent are not errors: the former is
//! silently clamped by the codec, the latter is reported as
//! [`TransmitOutcome::ConsentDenied`](crate::pipeline::TransmitOutcome).

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pipeline configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Encoded record has the wrong length for its wire format.
    #[error("Invalid record length: expected {expected} bytes, got {actual}")]
    InvalidRecordLength {
        /// Record length of the wire format.
        expected: usize,
        /// Length of the supplied bytes.
        actual: usize,
    },

    /// Decoded event tag does not name a known event kind.
    #[error("Unknown event tag: {tag}")]
    UnknownEventTag {
        /// The raw tag value.
        tag: u8,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Durable storage operation failed.
    #[error("Storage error for '{key}': {message}")]
    Storage {
        /// Storage key involved.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// Durable storage is not ready.
    ///
    /// The pipeline keeps running in memory-only mode when it sees this.
    #[error("Storage unavailable")]
    StorageUnavailable,

    // ========================================================================
    // Transmission Errors
    // ========================================================================
    /// Asymmetric encryption of a batch failed.
    #[error("Encryption failed: {message}")]
    Encryption {
        /// Description of the encryption failure.
        message: String,
    },

    /// Collector answered with a status other than 200.
    #[error("Collector rejected batch with status {status}")]
    CollectorStatus {
        /// HTTP status code returned.
        status: u16,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ========================================================================
    // Pipeline Errors
    // ========================================================================
    /// Pipeline task has shut down.
    #[error("Pipeline closed")]
    PipelineClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid record length error.
    #[inline]
    pub fn invalid_record_length(expected: usize, actual: usize) -> Self {
        Self::InvalidRecordLength { expected, actual }
    }

    /// Creates an unknown event tag error.
    #[inline]
    pub fn unknown_event_tag(tag: u8) -> Self {
        Self::UnknownEventTag { tag }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an encryption error.
    #[inline]
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Creates a collector status error.
    #[inline]
    pub fn collector_status(status: u16) -> Self {
        Self::CollectorStatus { status }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error happened while sending a batch.
    #[inline]
    #[must_use]
    pub fn is_transmission_error(&self) -> bool {
        matches!(
            self,
            Self::Encryption { .. } | Self::CollectorStatus { .. } | Self::Http(_)
        )
    }

    /// Returns `true` if this is a storage error.
    #[inline]
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::StorageUnavailable | Self::Io(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StorageUnavailable | Self::Http(_) => true,
            Self::CollectorStatus { status } => *status >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::collector_status(503);
        assert_eq!(err.to_string(), "Collector rejected batch with status 503");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing endpoint");
        assert_eq!(err.to_string(), "Configuration error: missing endpoint");
    }

    #[test]
    fn test_record_length_display() {
        let err = Error::invalid_record_length(6, 4);
        assert_eq!(
            err.to_string(),
            "Invalid record length: expected 6 bytes, got 4"
        );
    }

    #[test]
    fn test_is_transmission_error() {
        assert!(Error::encryption("bad key").is_transmission_error());
        assert!(Error::collector_status(404).is_transmission_error());
        assert!(!Error::StorageUnavailable.is_transmission_error());
    }

    #[test]
    fn test_is_storage_error() {
        assert!(Error::storage("batch", "disk full").is_storage_error());
        assert!(Error::StorageUnavailable.is_storage_error());
        assert!(!Error::config("test").is_storage_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::collector_status(502).is_recoverable());
        assert!(!Error::collector_status(400).is_recoverable());
        assert!(Error::StorageUnavailable.is_recoverable());
        assert!(!Error::unknown_event_tag(7).is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
