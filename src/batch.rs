//! Record batch buffer.
//!
//! Encoded records accumulate here until the buffer reaches the flush
//! threshold. The threshold is measured in bytes, not records, and equals
//! the largest plaintext the configured cipher encrypts in one operation.
//!
//! # Example
//!
//! ```
//! use tablog::batch::RecordBatch;
//! use tablog::codec::{EventKind, EventRecord, WireFormat};
//! use tablog::TabId;
//!
//! let mut batch = RecordBatch::new(12);
//! let record = WireFormat::Extended.encode(&EventRecord::new(TabId::new(1), EventKind::Created, 0));
//!
//! assert!(batch.append(&record).is_empty());
//! let flushed = batch.append(&record);
//! assert_eq!(flushed.len(), 1);
//! assert_eq!(flushed[0].len(), 12);
//! assert!(batch.is_empty());
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace};

use crate::codec::EncodedRecord;

// ============================================================================
// Constants
// ============================================================================

/// Default flush threshold in bytes (2048-bit RSA, PKCS#1 v1.5 padding,
/// rounded down to a whole number of 6-byte records).
pub const DEFAULT_THRESHOLD: usize = 240;

// ============================================================================
// RecordBatch
// ============================================================================

/// Ordered buffer of encoded record bytes with a byte-length flush threshold.
///
/// Invariant: after [`append`](Self::append) returns, the buffer is shorter
/// than the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    buffer: Vec<u8>,
    threshold: usize,
}

impl RecordBatch {
    /// Creates an empty batch.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is zero.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self::restore(Vec::new(), threshold)
    }

    /// Recreates a batch from persisted bytes.
    ///
    /// A restored buffer is not flushed until the next append, even if it
    /// already reaches the threshold.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is zero.
    #[must_use]
    pub fn restore(buffer: Vec<u8>, threshold: usize) -> Self {
        assert!(threshold > 0, "batch threshold must be positive");
        Self { buffer, threshold }
    }

    /// Returns the flush threshold in bytes.
    #[inline]
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the number of buffered bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the buffered bytes, oldest first.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns `true` if the buffer has reached the threshold.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.threshold
    }

    /// Appends a record and flushes every full threshold-sized slice.
    ///
    /// Returns the flushed slices, oldest first. Usually empty or one slice;
    /// more only when a restored buffer was already oversized.
    pub fn append(&mut self, record: &EncodedRecord) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(record.as_bytes());
        trace!(len = self.buffer.len(), threshold = self.threshold, "Record appended");

        let mut slices = Vec::new();
        while let Some(slice) = self.flush() {
            slices.push(slice);
        }
        slices
    }

    /// Splits off the oldest `threshold` bytes if the buffer is full.
    ///
    /// The remainder stays buffered. Returns `None` below the threshold.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if !self.is_full() {
            return None;
        }

        let remainder = self.buffer.split_off(self.threshold);
        let slice = std::mem::replace(&mut self.buffer, remainder);

        debug!(
            slice = slice.len(),
            remainder = self.buffer.len(),
            "Batch flushed"
        );
        Some(slice)
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
