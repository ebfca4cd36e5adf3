//! Single-writer task owning a [`Pipeline`].
//!
//! Host notifications can arrive from many tasks, but the pipeline state
//! must only be touched by one. [`PipelineHandle::spawn`] moves the pipeline
//! into a tokio task and hands out a cloneable handle that talks to it over
//! a channel.
//!
//! # Event Loop
//!
//! The task handles:
//!
//! - Commands from handles (observe, record, stats, shutdown)
//! - A periodic timer sampling the number of open tabs

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, interval_at};
use tracing::debug;

use crate::codec::{EncodedRecord, EventKind};
use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::stats::UsageStats;
use crate::tracker::TabEvent;

use super::Pipeline;

// ============================================================================
// PipelineCommand
// ============================================================================

/// Internal commands for the event loop.
enum PipelineCommand {
    /// Apply a host notification.
    Observe {
        event: TabEvent,
        reply_tx: oneshot::Sender<Option<EncodedRecord>>,
    },
    /// Record one event directly.
    Record {
        tab_id: TabId,
        kind: EventKind,
        background: bool,
        reply_tx: oneshot::Sender<EncodedRecord>,
    },
    /// Compute usage statistics.
    Stats {
        reply_tx: oneshot::Sender<UsageStats>,
    },
    /// Persist and stop.
    Shutdown { ack_tx: oneshot::Sender<()> },
}

// ============================================================================
// PipelineHandle
// ============================================================================

/// Handle to a pipeline running in its own task.
///
/// Cloning the handle is cheap. The task stops on [`shutdown`](Self::shutdown)
/// or when every handle is dropped.
#[derive(Clone)]
pub struct PipelineHandle {
    command_tx: mpsc::UnboundedSender<PipelineCommand>,
}

impl PipelineHandle {
    /// Spawns the event loop for `pipeline`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(pipeline: Pipeline) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_event_loop(pipeline, command_rx));
        Self { command_tx }
    }

    /// Applies a host notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineClosed`] if the task has stopped.
    pub async fn observe(&self, event: TabEvent) -> Result<Option<EncodedRecord>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PipelineCommand::Observe { event, reply_tx })?;
        reply_rx.await.map_err(|_| Error::PipelineClosed)
    }

    /// Records one event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineClosed`] if the task has stopped.
    pub async fn record(
        &self,
        tab_id: TabId,
        kind: EventKind,
        background: bool,
    ) -> Result<EncodedRecord> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PipelineCommand::Record {
            tab_id,
            kind,
            background,
            reply_tx,
        })?;
        reply_rx.await.map_err(|_| Error::PipelineClosed)
    }

    /// Computes usage statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineClosed`] if the task has stopped.
    pub async fn stats(&self) -> Result<UsageStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PipelineCommand::Stats { reply_tx })?;
        reply_rx.await.map_err(|_| Error::PipelineClosed)
    }

    /// Persists the pending batch and stops the task.
    ///
    /// Waits until the batch has been written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineClosed`] if the task had already stopped.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(PipelineCommand::Shutdown { ack_tx })?;
        ack_rx.await.map_err(|_| Error::PipelineClosed)
    }

    /// Returns `true` if the task has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    fn send(&self, command: PipelineCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::PipelineClosed)
    }

    /// Event loop owning the pipeline.
    async fn run_event_loop(
        mut pipeline: Pipeline,
        mut command_rx: mpsc::UnboundedReceiver<PipelineCommand>,
    ) {
        let period = pipeline.config().sample_interval;
        let mut sampler = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = sampler.tick() => {
                    pipeline.sample_open_tabs();
                    debug!(open = pipeline.tracker().open_count(), "Sampled open tabs");
                }

                command = command_rx.recv() => {
                    match command {
                        Some(PipelineCommand::Observe { event, reply_tx }) => {
                            let _ = reply_tx.send(pipeline.observe(event).await);
                        }

                        Some(PipelineCommand::Record { tab_id, kind, background, reply_tx }) => {
                            let _ = reply_tx.send(pipeline.record(tab_id, kind, background).await);
                        }

                        Some(PipelineCommand::Stats { reply_tx }) => {
                            let _ = reply_tx.send(pipeline.stats().await);
                        }

                        Some(PipelineCommand::Shutdown { ack_tx }) => {
                            debug!("Shutdown command received");
                            pipeline.persist_batch().await;
                            let _ = ack_tx.send(());
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            pipeline.persist_batch().await;
                            break;
                        }
                    }
                }
            }
        }

        debug!("Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
