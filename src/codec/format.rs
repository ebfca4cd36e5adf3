//! Versioned bitfield wire formats.
//!
//! Two revisions of the record layout exist. Both pack fields most
//! significant first in big-endian byte order.
//!
//! Extended (6 bytes):
//!
//! ```text
//! +-----------------+------------------+----------------+------------+
//! | tabid (18 bits) | offset (26 bits) | event (3 bits) | bg (1 bit) |
//! +-----------------+------------------+----------------+------------+
//! ```
//!
//! Legacy (5 bytes):
//!
//! ```text
//! +-----------------+------------------+----------------+
//! | tabid (16 bits) | offset (22 bits) | event (2 bits) |
//! +-----------------+------------------+----------------+
//! ```
//!
//! Fields wider than their slot are saturated to 0, never rejected.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::TabId;

use super::kind::EventKind;
use super::record::{EncodedRecord, EventRecord};

// ============================================================================
// Constants
// ============================================================================

const EXTENDED_TAB_BITS: u32 = 18;
const EXTENDED_OFFSET_BITS: u32 = 26;
const EXTENDED_KIND_BITS: u32 = 3;

const LEGACY_TAB_BITS: u32 = 16;
const LEGACY_OFFSET_BITS: u32 = 22;
const LEGACY_KIND_BITS: u32 = 2;

/// Largest record produced by any format.
pub const MAX_RECORD_LEN: usize = 6;

// ============================================================================
// WireFormat
// ============================================================================

/// Record layout revision.
///
/// Each variant implements the same encode contract, so the batch and
/// transmission layers only ever see opaque fixed-size byte records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// 5-byte layout without the background flag (kinds 0..=3).
    Legacy,
    /// 6-byte layout with background flag (kinds 0..=4).
    #[default]
    Extended,
}

impl WireFormat {
    /// Returns the encoded record length in bytes.
    #[inline]
    #[must_use]
    pub const fn record_len(self) -> usize {
        match self {
            Self::Legacy => 5,
            Self::Extended => 6,
        }
    }

    /// Returns the largest representable tab id.
    #[inline]
    #[must_use]
    pub const fn max_tab_id(self) -> u32 {
        match self {
            Self::Legacy => (1 << LEGACY_TAB_BITS) - 1,
            Self::Extended => (1 << EXTENDED_TAB_BITS) - 1,
        }
    }

    /// Returns the largest representable time offset in milliseconds.
    #[inline]
    #[must_use]
    pub const fn max_offset_ms(self) -> u64 {
        match self {
            Self::Legacy => (1 << LEGACY_OFFSET_BITS) - 1,
            Self::Extended => (1 << EXTENDED_OFFSET_BITS) - 1,
        }
    }

    /// Returns `true` if the format has a tag for `kind`.
    #[inline]
    #[must_use]
    pub const fn supports(self, kind: EventKind) -> bool {
        let kind_bits = match self {
            Self::Legacy => LEGACY_KIND_BITS,
            Self::Extended => EXTENDED_KIND_BITS,
        };
        (kind.tag() as u32) < (1 << kind_bits)
    }

    /// Returns `true` if the format carries the background flag.
    #[inline]
    #[must_use]
    pub const fn has_background(self) -> bool {
        matches!(self, Self::Extended)
    }

    /// Encodes a record, saturating out-of-range fields to 0.
    ///
    /// Never fails for supported kinds. The background flag is dropped by
    /// formats that lack it.
    ///
    /// # Panics
    ///
    /// Panics if the format has no tag for `record.kind`.
    #[must_use]
    pub fn encode(self, record: &EventRecord) -> EncodedRecord {
        assert!(
            self.supports(record.kind),
            "event kind {} has no tag in the {self} format",
            record.kind
        );

        let tab_id = self.saturate_tab_id(record.tab_id.get());
        let offset_ms = self.saturate_offset(record.offset_ms);
        let tag = u64::from(record.kind.tag());

        match self {
            Self::Extended => {
                let packed = (u64::from(tab_id) << (EXTENDED_OFFSET_BITS + EXTENDED_KIND_BITS + 1))
                    | (offset_ms << (EXTENDED_KIND_BITS + 1))
                    | (tag << 1)
                    | u64::from(record.background);
                let wide = packed.to_be_bytes();
                EncodedRecord::from_slice(&wide[2..])
            }
            Self::Legacy => {
                let low = (offset_ms << LEGACY_KIND_BITS) | tag;
                let tab = (tab_id as u16).to_be_bytes();
                let low = low.to_be_bytes();
                let mut bytes = [0u8; 5];
                bytes[..2].copy_from_slice(&tab);
                bytes[2..].copy_from_slice(&low[5..]);
                EncodedRecord::from_slice(&bytes)
            }
        }
    }

    /// Decodes a record produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRecordLength`] if `bytes` is not one record long
    /// - [`Error::UnknownEventTag`] if the event tag names no kind
    pub fn decode(self, bytes: &[u8]) -> Result<EventRecord> {
        if bytes.len() != self.record_len() {
            return Err(Error::invalid_record_length(self.record_len(), bytes.len()));
        }

        match self {
            Self::Extended => {
                let mut wide = [0u8; 8];
                wide[2..].copy_from_slice(bytes);
                let packed = u64::from_be_bytes(wide);

                let tag = ((packed >> 1) & mask(EXTENDED_KIND_BITS)) as u8;
                let kind = EventKind::from_tag(tag).ok_or_else(|| Error::unknown_event_tag(tag))?;

                Ok(EventRecord {
                    tab_id: TabId::new(
                        (packed >> (EXTENDED_OFFSET_BITS + EXTENDED_KIND_BITS + 1)) as u32,
                    ),
                    kind,
                    offset_ms: (packed >> (EXTENDED_KIND_BITS + 1)) & mask(EXTENDED_OFFSET_BITS),
                    background: packed & 1 == 1,
                })
            }
            Self::Legacy => {
                let tab_id = u16::from_be_bytes([bytes[0], bytes[1]]);
                let low = u32::from_be_bytes([0, bytes[2], bytes[3], bytes[4]]);

                let tag = (u64::from(low) & mask(LEGACY_KIND_BITS)) as u8;
                let kind = EventKind::from_tag(tag).ok_or_else(|| Error::unknown_event_tag(tag))?;

                Ok(EventRecord {
                    tab_id: TabId::new(u32::from(tab_id)),
                    kind,
                    offset_ms: u64::from(low >> LEGACY_KIND_BITS),
                    background: false,
                })
            }
        }
    }

    #[inline]
    fn saturate_tab_id(self, tab_id: u32) -> u32 {
        if tab_id > self.max_tab_id() { 0 } else { tab_id }
    }

    #[inline]
    fn saturate_offset(self, offset_ms: u64) -> u64 {
        if offset_ms > self.max_offset_ms() {
            0
        } else {
            offset_ms
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

#[inline]
const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

// ============================================================================
// Tests
// ============================================================================
