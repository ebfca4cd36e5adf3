//! Event codec.
//!
//! Packs one tab lifecycle event into a fixed-width binary record small
//! enough that a full batch fits one asymmetric encryption block.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`EventKind`] | Lifecycle event kind and its wire tag |
//! | [`EventRecord`] | Event tuple before encoding |
//! | [`EncodedRecord`] | Fixed-width encoded bytes |
//! | [`WireFormat`] | Layout revision (5-byte legacy, 6-byte extended) |
//!
//! # Example
//!
//! ```
//! use tablog::codec::{EventKind, EventRecord, WireFormat};
//! use tablog::TabId;
//!
//! let record = EventRecord::new(TabId::new(5), EventKind::Created, 120);
//! let encoded = WireFormat::Extended.encode(&record);
//! assert_eq!(encoded.as_bytes(), &[0x00, 0x01, 0x40, 0x00, 0x07, 0x80]);
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Versioned bitfield layouts.
pub mod format;

/// Event kinds.
pub mod kind;

/// Record types.
pub mod record;

// ============================================================================
// Re-exports
// ============================================================================

pub use format::{MAX_RECORD_LEN, WireFormat};
pub use kind::EventKind;
pub use record::{EncodedRecord, EventRecord};
