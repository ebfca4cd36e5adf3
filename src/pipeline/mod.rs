//! Event recording and batch transmission pipeline.
//!
//! [`Pipeline`] owns all mutable state of the logger: the timestamp of the
//! previous record, the pending batch and the tab tracker. Every operation is
//! a method on it, so there is no ambient state to reset between tests.
//!
//! # Flow
//!
//! ```text
//! TabEvent ─► TabTracker ─► encode ─► history log
//!                              │
//!                              ▼
//!                         RecordBatch ──(≥ threshold)──► transmit
//!                              │                           │
//!                              ▼                           ▼
//!                       persist pending          consent? ─► encrypt ─► POST
//! ```
//!
//! # Delivery
//!
//! A flushed slice leaves the batch before it is sent. If consent is
//! missing, or the send fails, the slice is dropped: delivery is at most
//! once and never retried.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `actor` | [`PipelineHandle`]: single-writer task around a pipeline |
//! | `builder` | [`PipelineBuilder`]: collaborator wiring and validation |
//! | `clock` | [`Clock`] trait, system and manual clocks |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::batch::RecordBatch;
use crate::codec::{EncodedRecord, EventKind, EventRecord};
use crate::config::{PipelineConfig, Preferences};
use crate::error::Result;
use crate::identifiers::{InstallationId, TabId};
use crate::stats::UsageStats;
use crate::storage::{HistoryLog, Storage, StorageKey};
use crate::tracker::{TabEvent, TabTracker};
use crate::transport::{Collector, Encryptor, FormBody, encode_ciphertext};

// ============================================================================
// Submodules
// ============================================================================

/// Single-writer pipeline task.
pub mod actor;

/// Pipeline construction.
pub mod builder;

/// Time sources.
pub mod clock;

// ============================================================================
// Re-exports
// ============================================================================

pub use actor::PipelineHandle;
pub use builder::PipelineBuilder;
pub use clock::{Clock, ManualClock, SystemClock};

// ============================================================================
// TransmitOutcome
// ============================================================================

/// Result of handing a flushed slice to transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    /// Collector acknowledged the batch.
    Sent,
    /// User has not consented; the slice was dropped unsent.
    ConsentDenied,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Tab event logger state and its collaborators.
pub struct Pipeline {
    config: PipelineConfig,
    storage: Arc<dyn Storage>,
    encryptor: Arc<dyn Encryptor>,
    collector: Arc<dyn Collector>,
    clock: Arc<dyn Clock>,
    installation_id: InstallationId,
    id_persisted: AtomicBool,
    log: Option<HistoryLog>,
    batch: RecordBatch,
    tracker: TabTracker,
    last_event_ms: u64,
}

// ============================================================================
// Pipeline - Constructor
// ============================================================================

impl Pipeline {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Loads persisted state and assembles the pipeline.
    ///
    /// Called by [`PipelineBuilder::build`] after validation. Storage that is
    /// not ready yields an empty batch and a fresh installation id, which is
    /// written on the first successful batch persist.
    pub(crate) async fn open(
        config: PipelineConfig,
        storage: Arc<dyn Storage>,
        encryptor: Arc<dyn Encryptor>,
        collector: Arc<dyn Collector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (installation_id, id_persisted) =
            InstallationId::load_or_generate(storage.as_ref()).await;

        let pending = match storage.load(StorageKey::PendingBatch).await {
            Ok(pending) => pending.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Could not restore pending batch, starting empty");
                Vec::new()
            }
        };

        let log = config
            .log_path
            .as_ref()
            .map(|path| HistoryLog::new(path, config.log_max_lines));

        info!(
            format = %config.format,
            threshold = config.threshold,
            restored = pending.len(),
            "Pipeline opened"
        );

        Self {
            batch: RecordBatch::restore(pending, config.threshold),
            tracker: TabTracker::new(config.log_activated),
            last_event_ms: clock.now_ms(),
            config,
            storage,
            encryptor,
            collector,
            clock,
            installation_id,
            id_persisted: AtomicBool::new(id_persisted),
            log,
        }
    }
}

// ============================================================================
// Pipeline - Recording
// ============================================================================

impl Pipeline {
    /// Applies a host notification, recording it if the tracker says so.
    ///
    /// Returns the encoded record, or `None` if the notification was not
    /// recorded. Tab bookkeeping still happens for kinds the configured
    /// format has no tag for (replacements in the legacy format), but
    /// nothing is recorded for them.
    pub async fn observe(&mut self, event: TabEvent) -> Option<EncodedRecord> {
        let now_ms = self.clock.now_ms();
        let observation = self.tracker.observe(event, now_ms)?;

        if !self.config.format.supports(observation.kind) {
            debug!(
                tab_id = %observation.tab_id,
                kind = %observation.kind,
                format = %self.config.format,
                "Event kind not recorded in this format"
            );
            return None;
        }

        Some(
            self.record(observation.tab_id, observation.kind, observation.background)
                .await,
        )
    }

    /// Encodes one event, logs it, appends it to the batch and sends every
    /// batch slice that fills up.
    ///
    /// The time offset is measured from the previous record and the
    /// previous-record timestamp is updated unconditionally. Storage and
    /// transmission failures are logged and do not fail the call.
    ///
    /// # Panics
    ///
    /// Panics if the configured wire format has no tag for `kind`.
    pub async fn record(&mut self, tab_id: TabId, kind: EventKind, background: bool) -> EncodedRecord {
        let now_ms = self.clock.now_ms();
        let offset_ms = now_ms.saturating_sub(self.last_event_ms);
        self.last_event_ms = now_ms;

        let record = EventRecord::new(tab_id, kind, offset_ms).with_background(background);
        let encoded = self.config.format.encode(&record);

        debug!(line = %record.to_log_line(), background, "Store line");

        if let Some(log) = &self.log
            && let Err(e) = log.append(&record).await
        {
            warn!(error = %e, path = %log.path().display(), "Failed to append history log");
        }

        let slices = self.batch.append(&encoded);
        self.persist_batch().await;

        for slice in slices {
            match self.transmit(&slice).await {
                Ok(TransmitOutcome::Sent) => {}
                Ok(TransmitOutcome::ConsentDenied) => {
                    debug!(len = slice.len(), "No consent, batch dropped");
                }
                Err(e) => {
                    warn!(error = %e, len = slice.len(), "Batch transmission failed, batch dropped");
                }
            }
        }

        encoded
    }
}

// ============================================================================
// Pipeline - Transmission
// ============================================================================

impl Pipeline {
    /// Sends one flushed slice to the collector.
    ///
    /// Consent is read from the stored preferences at call time. On success
    /// the persisted batch is refreshed and an oversized history log is
    /// deleted.
    ///
    /// # Errors
    ///
    /// - [`Error::Encryption`](crate::Error::Encryption) if encryption fails
    /// - [`Error::CollectorStatus`](crate::Error::CollectorStatus) for non-200 answers
    /// - [`Error::Http`](crate::Error::Http) for network failures
    pub async fn transmit(&self, slice: &[u8]) -> Result<TransmitOutcome> {
        let prefs = Preferences::load(self.storage.as_ref()).await;
        if !prefs.send_stats {
            return Ok(TransmitOutcome::ConsentDenied);
        }

        let ciphertext = self.encryptor.encrypt(slice)?;
        let mut body = FormBody::new(
            self.installation_id.pseudonym(),
            encode_ciphertext(&ciphertext),
        );
        if let Some(version) = &self.config.version {
            body = body.with_version(version.clone());
        }

        self.collector.submit(&body).await?;
        info!(len = slice.len(), "Batch sent");

        self.persist_batch().await;
        self.truncate_log().await;

        Ok(TransmitOutcome::Sent)
    }
}

// ============================================================================
// Pipeline - State
// ============================================================================

impl Pipeline {
    /// Writes first-run preferences if consent has not been asked yet.
    ///
    /// Returns the preferences now in effect.
    ///
    /// # Errors
    ///
    /// Returns storage errors from saving the defaults.
    pub async fn bootstrap_preferences(&self, send_stats: bool) -> Result<Preferences> {
        let prefs = Preferences::load(self.storage.as_ref()).await;
        if !prefs.first_run {
            return Ok(prefs);
        }

        let prefs = Preferences::first_run_defaults(send_stats);
        prefs.save(self.storage.as_ref()).await?;
        info!(send_stats, "First run preferences stored");
        Ok(prefs)
    }

    /// Registers tabs already open at startup.
    pub fn seed_tabs(&mut self, tabs: impl IntoIterator<Item = TabId>) {
        let now_ms = self.clock.now_ms();
        self.tracker.seed(tabs, now_ms);
    }

    /// Samples the number of open tabs for statistics.
    pub fn sample_open_tabs(&mut self) {
        self.tracker.sample_open_tabs();
    }

    /// Computes usage statistics.
    ///
    /// Counts are zero when no history log is configured or it cannot be
    /// read.
    pub async fn stats(&self) -> UsageStats {
        let entries = match &self.log {
            Some(log) => log.entries().await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read history log");
                Vec::new()
            }),
            None => Vec::new(),
        };

        UsageStats::collect(&entries, &self.tracker)
    }

    /// Persists the pending batch, logging instead of failing.
    ///
    /// Once storage accepts the batch, an installation id that could not be
    /// written at startup is written too.
    pub async fn persist_batch(&self) {
        if let Err(e) = self
            .storage
            .store(StorageKey::PendingBatch, self.batch.as_bytes())
            .await
        {
            warn!(error = %e, len = self.batch.len(), "Failed to persist batch, continuing in memory");
            return;
        }

        if !self.id_persisted.load(Ordering::Acquire) {
            match self
                .installation_id
                .persist_if_absent(self.storage.as_ref())
                .await
            {
                Ok(()) => self.id_persisted.store(true, Ordering::Release),
                Err(e) => debug!(error = %e, "Installation id still not persisted"),
            }
        }
    }

    async fn truncate_log(&self) {
        if let Some(log) = &self.log
            && let Err(e) = log.truncate_if_oversized().await
        {
            warn!(error = %e, "Failed to truncate history log");
        }
    }
}

// ============================================================================
// Pipeline - Accessors
// ============================================================================

impl Pipeline {
    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the pending batch.
    #[inline]
    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Returns the tab tracker.
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &TabTracker {
        &self.tracker
    }

    /// Returns the installation id.
    #[inline]
    #[must_use]
    pub fn installation_id(&self) -> &InstallationId {
        &self.installation_id
    }

    /// Returns the timestamp of the previous record.
    #[inline]
    #[must_use]
    pub fn last_event_ms(&self) -> u64 {
        self.last_event_ms
    }
}

// ============================================================================
// Tests
// ============================================================================
