//! Conceptual and encoded record types.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::TabId;

use super::format::MAX_RECORD_LEN;
use super::kind::EventKind;

// ============================================================================
// EventRecord
// ============================================================================

/// One tab lifecycle event before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventRecord {
    /// Source tab, may exceed the format's maximum (saturated on encode).
    pub tab_id: TabId,
    /// Event kind.
    pub kind: EventKind,
    /// Milliseconds since the previous record.
    pub offset_ms: u64,
    /// Tab was not the active tab when the event fired.
    pub background: bool,
}

impl EventRecord {
    /// Creates a foreground record.
    #[inline]
    #[must_use]
    pub fn new(tab_id: TabId, kind: EventKind, offset_ms: u64) -> Self {
        Self {
            tab_id,
            kind,
            offset_ms,
            background: false,
        }
    }

    /// Sets the background flag.
    #[inline]
    #[must_use]
    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Formats the record as a history log line (without newline).
    ///
    /// Format: `tabId,eventName,offsetMs`
    #[must_use]
    pub fn to_log_line(&self) -> String {
        format!("{},{},{}", self.tab_id, self.kind.name(), self.offset_ms)
    }
}

// ============================================================================
// EncodedRecord
// ============================================================================

/// Immutable fixed-width encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodedRecord {
    bytes: [u8; MAX_RECORD_LEN],
    len: u8,
}

impl EncodedRecord {
    /// Copies an encoded record out of `bytes`.
    ///
    /// Only the codec builds records, always from a slice no longer than
    /// [`MAX_RECORD_LEN`].
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= MAX_RECORD_LEN);
        let mut buf = [0u8; MAX_RECORD_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Self {
            bytes: buf,
            len: bytes.len() as u8,
        }
    }

    /// Returns the encoded bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Returns the record length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the record holds no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for EncodedRecord {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line() {
        let record = EventRecord::new(TabId::new(42), EventKind::Loaded, 1500);
        assert_eq!(record.to_log_line(), "42,onLoaded,1500");
    }

    #[test]
    fn test_with_background() {
        let record = EventRecord::new(TabId::new(1), EventKind::Created, 0).with_background(true);
        assert!(record.background);
    }

    #[test]
    fn test_encoded_record_slice() {
        let encoded = EncodedRecord::from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(encoded.len(), 5);
        assert!(!encoded.is_empty());
        assert_eq!(encoded.as_ref(), &[1, 2, 3, 4, 5]);
    }
}
