//! Append-only plaintext history log.
//!
//! One line per recorded event: `tabId,eventName,offsetMs`. The log is only
//! read back to compute usage statistics and to decide whether it has grown
//! past its ceiling, in which case it is deleted outright.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::codec::{EventKind, EventRecord};
use crate::error::Result;
use crate::identifiers::TabId;

// ============================================================================
// Constants
// ============================================================================

/// Default number of lines after which the log is deleted.
pub const DEFAULT_MAX_LINES: usize = 300_000;

// ============================================================================
// LogEntry
// ============================================================================

/// One parsed history log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Tab the event came from.
    pub tab_id: TabId,
    /// Event kind.
    pub kind: EventKind,
    /// Milliseconds since the previous event.
    pub offset_ms: u64,
}

impl LogEntry {
    /// Parses a `tabId,eventName,offsetMs` line.
    ///
    /// Returns `None` for malformed lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim_end().split(',');
        let tab_id = fields.next()?.parse().ok()?;
        let kind = EventKind::from_name(fields.next()?)?;
        let offset_ms = fields.next()?.parse().ok()?;

        Some(Self {
            tab_id: TabId::new(tab_id),
            kind,
            offset_ms,
        })
    }
}

// ============================================================================
// HistoryLog
// ============================================================================

/// Append-only event log file.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
    max_lines: usize,
}

impl HistoryLog {
    /// Creates a log handle. The file is created on first append.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
        }
    }

    /// Returns the log file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the line ceiling.
    #[inline]
    #[must_use]
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Appends one record as a log line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be written.
    pub async fn append(&self, record: &EventRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = record.to_log_line();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;

        Ok(())
    }

    /// Reads and parses every line, skipping malformed ones.
    ///
    /// A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) on read failures other than
    /// the file not existing.
    pub async fn entries(&self) -> Result<Vec<LogEntry>> {
        let Some(contents) = self.read().await? else {
            return Ok(Vec::new());
        };

        let mut skipped = 0usize;
        let entries: Vec<LogEntry> = contents
            .lines()
            .filter_map(|line| {
                let entry = LogEntry::parse(line);
                if entry.is_none() {
                    skipped += 1;
                }
                entry
            })
            .collect();

        if skipped > 0 {
            warn!(skipped, path = %self.path.display(), "Skipped malformed log lines");
        }

        Ok(entries)
    }

    /// Returns the number of lines in the log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) on read failures.
    pub async fn line_count(&self) -> Result<usize> {
        Ok(self
            .read()
            .await?
            .map_or(0, |contents| contents.lines().count()))
    }

    /// Deletes the log if it splits into more than `max_lines` segments.
    ///
    /// Segments are counted by splitting on `'\n'`, so the empty tail after
    /// the final newline counts as one. A log of `max_lines` complete lines
    /// is therefore already past the ceiling.
    ///
    /// Returns `true` if the file was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) on read or delete failures.
    pub async fn truncate_if_oversized(&self) -> Result<bool> {
        let Some(contents) = self.read().await? else {
            return Ok(false);
        };
        let lines = contents.split('\n').count();
        debug!(lines, max = self.max_lines, "History log size");

        if lines <= self.max_lines {
            return Ok(false);
        }

        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        info!(lines, path = %self.path.display(), "History log truncated");
        Ok(true)
    }

    async fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
