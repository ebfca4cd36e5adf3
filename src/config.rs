//! Pipeline configuration and persisted user preferences.
//!
//! [`PipelineConfig`] is fixed at build time and follows the builder style
//! of `with_*` methods. [`Preferences`] belong to the user, live in durable
//! storage as JSON, and are re-read every time a batch is flushed so a
//! consent change applies to the next send.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tablog::config::PipelineConfig;
//! use tablog::codec::WireFormat;
//!
//! let config = PipelineConfig::new("https://collector.example.org/batch")
//!     .with_format(WireFormat::Legacy)
//!     .with_threshold(200)
//!     .with_sample_interval(Duration::from_secs(60));
//!
//! assert_eq!(config.threshold, 200);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::batch::DEFAULT_THRESHOLD;
use crate::codec::WireFormat;
use crate::error::{Error, Result};
use crate::storage::log::DEFAULT_MAX_LINES;
use crate::storage::{Storage, StorageKey};

// ============================================================================
// Constants
// ============================================================================

/// Default interval between open-tab count samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default tab count above which idle tabs are candidates for sleeping.
pub const DEFAULT_NUM_TABS: u32 = 10;

/// Default idle minutes before a tab is a candidate for sleeping.
pub const DEFAULT_MIN_TIME_MINUTES: u32 = 20;

/// Domains never treated as idle by default.
pub const DEFAULT_EXCEPTION_LIST: [&str; 2] = ["youtube.com", "play.spotify.com"];

// ============================================================================
// PipelineConfig
// ============================================================================

/// Static pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Record layout revision.
    pub format: WireFormat,

    /// Flush threshold in bytes.
    pub threshold: usize,

    /// Collector endpoint receiving form-encoded batches.
    pub endpoint: String,

    /// Version string sent alongside each batch.
    pub version: Option<String>,

    /// History log path, or `None` to keep no log.
    pub log_path: Option<PathBuf>,

    /// Line count after which the history log is deleted.
    pub log_max_lines: usize,

    /// Interval between open-tab count samples.
    pub sample_interval: Duration,

    /// Record tab activations as events.
    pub log_activated: bool,
}

impl PipelineConfig {
    /// Creates a configuration with defaults for everything but the endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            format: WireFormat::default(),
            threshold: DEFAULT_THRESHOLD,
            endpoint: endpoint.into(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            log_path: None,
            log_max_lines: DEFAULT_MAX_LINES,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            log_activated: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PipelineConfig {
    /// Sets the record layout revision.
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the flush threshold in bytes.
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the version string sent with each batch.
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Omits the version field from transmitted batches.
    #[inline]
    #[must_use]
    pub fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    /// Enables the history log at `path`.
    #[inline]
    #[must_use]
    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the history log line ceiling.
    #[inline]
    #[must_use]
    pub fn with_log_max_lines(mut self, max_lines: usize) -> Self {
        self.log_max_lines = max_lines;
        self
    }

    /// Sets the open-tab sampling interval.
    #[inline]
    #[must_use]
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Records tab activations as events.
    #[inline]
    #[must_use]
    pub fn with_log_activated(mut self) -> Self {
        self.log_activated = true;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PipelineConfig {
    /// Validates the configuration against the cipher's plaintext ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - the threshold is smaller than one record
    /// - the threshold exceeds `max_plaintext_len`
    /// - the endpoint is not an `https` URL
    /// - the sample interval is zero
    pub fn validate(&self, max_plaintext_len: usize) -> Result<()> {
        if self.threshold < self.format.record_len() {
            return Err(Error::config(format!(
                "Threshold {} is smaller than one {}-byte record",
                self.threshold,
                self.format.record_len()
            )));
        }

        if self.threshold > max_plaintext_len {
            return Err(Error::config(format!(
                "Threshold {} exceeds cipher plaintext limit {}",
                self.threshold, max_plaintext_len
            )));
        }

        let url = Url::parse(&self.endpoint)
            .map_err(|e| Error::config(format!("Invalid endpoint '{}': {e}", self.endpoint)))?;
        if url.scheme() != "https" {
            return Err(Error::config(format!(
                "Endpoint must use https, got '{}'",
                url.scheme()
            )));
        }

        if self.sample_interval.is_zero() {
            return Err(Error::config("Sample interval must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// User preferences owned by the settings collaborator.
///
/// Only `send_stats` matters to transmission. The idle-tab fields are kept
/// so the whole stored object round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// User agreed to send usage statistics.
    pub send_stats: bool,

    /// Open tab count above which idle tabs may sleep.
    pub num_tabs: u32,

    /// Idle minutes before a tab may sleep.
    pub min_time: u32,

    /// Domains never put to sleep.
    pub exception_list: Vec<String>,

    /// Consent has not been asked yet.
    pub first_run: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            send_stats: false,
            num_tabs: DEFAULT_NUM_TABS,
            min_time: DEFAULT_MIN_TIME_MINUTES,
            exception_list: DEFAULT_EXCEPTION_LIST.iter().map(|s| s.to_string()).collect(),
            first_run: true,
        }
    }
}

impl Preferences {
    /// Returns the defaults written after the first-run consent prompt.
    #[must_use]
    pub fn first_run_defaults(send_stats: bool) -> Self {
        Self {
            send_stats,
            first_run: false,
            ..Self::default()
        }
    }

    /// Loads preferences, falling back to defaults.
    ///
    /// Missing, unreadable or malformed preferences all yield the defaults,
    /// which deny consent.
    pub async fn load(storage: &dyn Storage) -> Self {
        match storage.load(StorageKey::Preferences).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!(error = %e, "Malformed preferences, using defaults");
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                debug!(error = %e, "Preferences unavailable, using defaults");
                Self::default()
            }
        }
    }

    /// Persists the preferences as JSON.
    ///
    /// # Errors
    ///
    /// Returns storage or serialization errors.
    pub async fn save(&self, storage: &dyn Storage) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        storage.store(StorageKey::Preferences, &bytes).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::MemoryStorage;

    const ENDPOINT: &str = "https://collector.example.org/batch";

    #[test]
    fn test_new_defaults() {
        let config = PipelineConfig::new(ENDPOINT);
        assert_eq!(config.format, WireFormat::Extended);
        assert_eq!(config.threshold, 240);
        assert_eq!(config.log_max_lines, 300_000);
        assert_eq!(config.sample_interval, Duration::from_secs(300));
        assert!(config.version.is_some());
        assert!(config.log_path.is_none());
        assert!(!config.log_activated);
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::new(ENDPOINT)
            .with_format(WireFormat::Legacy)
            .with_threshold(100)
            .with_version("1.2.3")
            .with_log("/tmp/history.log")
            .with_log_max_lines(10)
            .with_log_activated();

        assert_eq!(config.format, WireFormat::Legacy);
        assert_eq!(config.threshold, 100);
        assert_eq!(config.version.as_deref(), Some("1.2.3"));
        assert_eq!(config.log_path, Some(PathBuf::from("/tmp/history.log")));
        assert_eq!(config.log_max_lines, 10);
        assert!(config.log_activated);
        assert!(config.without_version().version.is_none());
    }

    #[test]
    fn test_validate_valid() {
        assert!(PipelineConfig::new(ENDPOINT).validate(245).is_ok());
    }

    #[test]
    fn test_validate_threshold_over_cipher_limit() {
        let err = PipelineConfig::new(ENDPOINT).validate(117).unwrap_err();
        assert!(err.to_string().contains("exceeds cipher plaintext limit"));
    }

    #[test]
    fn test_validate_threshold_below_record() {
        let config = PipelineConfig::new(ENDPOINT).with_threshold(5);
        assert!(config.validate(245).is_err());
    }

    #[test]
    fn test_validate_rejects_plain_http() {
        let config = PipelineConfig::new("http://collector.example.org");
        assert!(config.validate(245).is_err());
        assert!(PipelineConfig::new("not a url").validate(245).is_err());
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = PipelineConfig::new(ENDPOINT).with_sample_interval(Duration::ZERO);
        assert!(config.validate(245).is_err());
    }

    #[test]
    fn test_preferences_defaults() {
        let prefs = Preferences::default();
        assert!(!prefs.send_stats);
        assert!(prefs.first_run);
        assert_eq!(prefs.num_tabs, 10);
        assert_eq!(prefs.min_time, 20);
        assert_eq!(prefs.exception_list, vec!["youtube.com", "play.spotify.com"]);
    }

    #[test]
    fn test_preferences_json_names() {
        let prefs = Preferences::first_run_defaults(true);
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["sendStats"], true);
        assert_eq!(json["firstRun"], false);
        assert!(json.get("exceptionList").is_some());
    }

    #[test]
    fn test_preferences_partial_json() {
        let prefs: Preferences = serde_json::from_str(r#"{"sendStats": true}"#).unwrap();
        assert!(prefs.send_stats);
        assert_eq!(prefs.num_tabs, DEFAULT_NUM_TABS);
    }

    #[tokio::test]
    async fn test_preferences_save_and_load() {
        let storage = MemoryStorage::new();
        Preferences::first_run_defaults(true)
            .save(&storage)
            .await
            .unwrap();

        let loaded = Preferences::load(&storage).await;
        assert!(loaded.send_stats);
        assert!(!loaded.first_run);
    }

    #[tokio::test]
    async fn test_preferences_malformed_fall_back() {
        let storage = MemoryStorage::new();
        storage
            .store(StorageKey::Preferences, b"{not json")
            .await
            .unwrap();

        assert_eq!(Preferences::load(&storage).await, Preferences::default());
    }

    #[tokio::test]
    async fn test_preferences_unavailable_deny_consent() {
        let storage = MemoryStorage::new();
        storage.set_unavailable(true);
        assert!(!Preferences::load(&storage).await.send_stats);
    }
}
