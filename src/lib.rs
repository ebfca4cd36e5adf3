//! Tablog - Browser tab lifecycle logger.
//!
//! This library records tab lifecycle events (created, loaded, updated,
//! replaced, removed) as compact fixed-width binary records, accumulates
//! them into batches and delivers each full batch encrypted to a remote
//! collector, subject to user consent.
//!
//! # Architecture
//!
//! - **Codec**: 6-byte extended or 5-byte legacy big-endian records
//! - **Batch**: byte buffer flushed in slices at a byte threshold
//! - **Transport**: RSA PKCS#1 v1.5, URL-safe base64, HTTPS form POST
//! - **Storage**: pending batch, installation id and preferences survive
//!   restarts; failures degrade to memory-only operation
//!
//! A [`Pipeline`] owns all mutable state. [`PipelineHandle`] runs it as a
//! single-writer task for hosts that deliver notifications concurrently.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tablog::{FileStorage, Pipeline, PipelineConfig, PipelineHandle, RsaEncryptor, TabEvent, TabId};
//!
//! #[tokio::main]
//! async fn main() -> tablog::Result<()> {
//!     let storage = FileStorage::open("./tablog-state").await?;
//!     let encryptor = RsaEncryptor::from_hex_components("c0ffee...", "10001")?;
//!
//!     let pipeline = Pipeline::builder()
//!         .config(PipelineConfig::new("https://collector.example.org/batch"))
//!         .storage(Arc::new(storage))
//!         .encryptor(Arc::new(encryptor))
//!         .build()
//!         .await?;
//!     pipeline.bootstrap_preferences(true).await?;
//!
//!     let handle = PipelineHandle::spawn(pipeline);
//!     handle
//!         .observe(TabEvent::Created { tab_id: TabId::new(1), active: true })
//!         .await?;
//!
//!     handle.shutdown().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Threshold-flushed record buffer |
//! | [`codec`] | Wire formats and event kinds |
//! | [`config`] | Pipeline configuration and user preferences |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Tab and installation identifiers |
//! | [`pipeline`] | Recording, transmission and the pipeline task |
//! | [`stats`] | Usage statistics |
//! | [`storage`] | Durable key-value storage and history log |
//! | [`tracker`] | Host notification filtering and tab bookkeeping |
//! | [`transport`] | Encryption, envelope and collector client |

// ============================================================================
// Modules
// ============================================================================

/// Threshold-flushed record buffer.
pub mod batch;

/// Binary record codec.
///
/// Two fixed-width big-endian layouts; see [`WireFormat`].
pub mod codec;

/// Pipeline configuration and user preferences.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Tab and installation identifiers.
pub mod identifiers;

/// Event recording and batch transmission.
pub mod pipeline;

/// Usage statistics.
pub mod stats;

/// Durable storage.
pub mod storage;

/// Tab bookkeeping and notification filtering.
pub mod tracker;

/// Batch encryption and delivery.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Codec types
pub use batch::RecordBatch;
pub use codec::{EncodedRecord, EventKind, EventRecord, WireFormat};

// Configuration
pub use config::{PipelineConfig, Preferences};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{InstallationId, TabId};

// Pipeline types
pub use pipeline::{
    Clock, ManualClock, Pipeline, PipelineBuilder, PipelineHandle, SystemClock, TransmitOutcome,
};

// Statistics and tracking
pub use stats::UsageStats;
pub use tracker::{TabEvent, TabTracker};

// Storage types
pub use storage::{FileStorage, HistoryLog, MemoryStorage, Storage, StorageKey};

// Transport types
pub use transport::{Collector, Encryptor, FormBody, HttpCollector, RsaEncryptor};
