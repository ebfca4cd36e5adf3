//! Tab lifecycle event kinds and their wire tags.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// EventKind
// ============================================================================

/// Kind of tab lifecycle event carried by a record.
///
/// The discriminant is the wire tag. The legacy 5-byte format only has room
/// for the first four kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    /// Tab was created.
    Created = 0,
    /// Navigation in the tab completed.
    Loaded = 1,
    /// Tab was updated (started loading, changed URL).
    Updated = 2,
    /// Tab was closed.
    Removed = 3,
    /// Tab was replaced by a prerendered or instant tab.
    Replaced = 4,
}

impl EventKind {
    /// All kinds, in tag order.
    pub const ALL: [EventKind; 5] = [
        Self::Created,
        Self::Loaded,
        Self::Updated,
        Self::Removed,
        Self::Replaced,
    ];

    /// Returns the wire tag.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by wire tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Created),
            1 => Some(Self::Loaded),
            2 => Some(Self::Updated),
            3 => Some(Self::Removed),
            4 => Some(Self::Replaced),
            _ => None,
        }
    }

    /// Returns the listener-style name written to the history log.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "onCreated",
            Self::Loaded => "onLoaded",
            Self::Updated => "onUpdated",
            Self::Removed => "onRemoved",
            Self::Replaced => "onReplaced",
        }
    }

    /// Looks up a kind by its history log name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_sequential() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, i);
            assert_eq!(EventKind::from_tag(kind.tag()), Some(*kind));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(EventKind::from_tag(5), None);
        assert_eq!(EventKind::from_tag(7), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(EventKind::Created.to_string(), "onCreated");
        assert_eq!(EventKind::from_name("onRemoved"), Some(EventKind::Removed));
        assert_eq!(EventKind::from_name("onActivated"), None);
    }
}
