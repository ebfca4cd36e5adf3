//! Builder pattern for pipeline construction.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tablog::{Pipeline, PipelineConfig, RsaEncryptor};
//!
//! # async fn example() -> tablog::Result<()> {
//! let encryptor = RsaEncryptor::from_hex_components("c0ffee...", "10001")?;
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::new("https://collector.example.org/batch"))
//!     .encryptor(Arc::new(encryptor))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::storage::{MemoryStorage, Storage};
use crate::transport::{Collector, Encryptor, HttpCollector};

use super::Pipeline;
use super::clock::{Clock, SystemClock};

// ============================================================================
// PipelineBuilder
// ============================================================================

/// Builder for a [`Pipeline`].
///
/// Configuration and encryptor are required. Storage defaults to
/// [`MemoryStorage`], the collector to an [`HttpCollector`] for the
/// configured endpoint and the clock to [`SystemClock`].
#[derive(Default, Clone)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    storage: Option<Arc<dyn Storage>>,
    encryptor: Option<Arc<dyn Encryptor>>,
    collector: Option<Arc<dyn Collector>>,
    clock: Option<Arc<dyn Clock>>,
}

// ============================================================================
// PipelineBuilder Implementation
// ============================================================================

impl PipelineBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the persistent storage.
    #[inline]
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the batch encryptor.
    #[inline]
    #[must_use]
    pub fn encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Sets the collector client.
    #[inline]
    #[must_use]
    pub fn collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Sets the time source.
    #[inline]
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the configuration and opens the pipeline.
    ///
    /// Restores the pending batch and the installation id from storage.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if config or encryptor is missing
    /// - [`Error::Config`] if the configuration is invalid for the encryptor
    /// - [`Error::Http`] if the default collector cannot be created
    pub async fn build(self) -> Result<Pipeline> {
        let config = self.config.ok_or_else(|| {
            Error::config("Pipeline config is required. Use .config() to set it.")
        })?;
        let encryptor = self.encryptor.ok_or_else(|| {
            Error::config("Encryptor is required. Use .encryptor() to set it.")
        })?;

        config.validate(encryptor.max_plaintext_len())?;

        let collector = match self.collector {
            Some(collector) => collector,
            None => Arc::new(HttpCollector::new(&config.endpoint)?),
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(Pipeline::open(config, storage, encryptor, collector, clock).await)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSize(usize);

    impl Encryptor for FixedSize {
        fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
            Ok(plaintext.to_vec())
        }

        fn max_plaintext_len(&self) -> usize {
            self.0
        }
    }

    const ENDPOINT: &str = "https://collector.example.org/batch";

    #[tokio::test]
    async fn test_missing_config() {
        let result = PipelineBuilder::new()
            .encryptor(Arc::new(FixedSize(245)))
            .build()
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_missing_encryptor() {
        let result = PipelineBuilder::new()
            .config(PipelineConfig::new(ENDPOINT))
            .build()
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_threshold_above_key_capacity() {
        let result = PipelineBuilder::new()
            .config(PipelineConfig::new(ENDPOINT))
            .encryptor(Arc::new(FixedSize(117)))
            .build()
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_defaults() {
        let pipeline = PipelineBuilder::new()
            .config(PipelineConfig::new(ENDPOINT))
            .encryptor(Arc::new(FixedSize(245)))
            .build()
            .await
            .unwrap();

        assert!(pipeline.batch().is_empty());
        assert_eq!(pipeline.batch().threshold(), 240);
        assert_eq!(pipeline.installation_id().as_str().len(), 36);
    }
}
