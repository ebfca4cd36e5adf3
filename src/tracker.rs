//! Tab tracking: which host notifications become records.
//!
//! The host reports more notifications than the log wants. A freshly
//! created tab, for instance, fires both a creation and an update; only
//! updates that start a page load on an already known tab are recorded.
//! The tracker also keeps the bounded samples behind the usage statistics.
//!
//! # Recording Rules
//!
//! | Notification | Recorded as | Condition |
//! |--------------|-------------|-----------|
//! | `Created` | `Created` | always |
//! | `Loaded` | `Loaded` | always |
//! | `Updated` | `Updated` | tab unknown, or known and loading |
//! | `Activated` | `Updated` | only with `log_activated` |
//! | `Replaced` | `Replaced` | always |
//! | `Removed` | `Removed` | always |

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::codec::EventKind;
use crate::identifiers::TabId;

// ============================================================================
// Constants
// ============================================================================

/// Number of most recent samples kept per statistic.
pub const MAX_SAMPLES: usize = 100;

// ============================================================================
// TabEvent
// ============================================================================

/// Lifecycle notification delivered by the host browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    /// A tab was opened.
    Created {
        /// New tab.
        tab_id: TabId,
        /// The new tab is the active tab.
        active: bool,
    },
    /// Navigation in a tab completed.
    Loaded {
        /// Tab that finished loading.
        tab_id: TabId,
    },
    /// A tab's state changed.
    Updated {
        /// Updated tab.
        tab_id: TabId,
        /// The change started a page load.
        loading: bool,
    },
    /// A tab became the active tab.
    Activated {
        /// Newly active tab.
        tab_id: TabId,
    },
    /// A tab was swapped for a prerendered one.
    Replaced {
        /// Tab taking the old tab's place.
        tab_id: TabId,
        /// Tab that went away.
        replaced_tab_id: TabId,
    },
    /// A tab was closed.
    Removed {
        /// Closed tab.
        tab_id: TabId,
    },
}

impl TabEvent {
    /// Returns the tab the notification is about.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        match *self {
            Self::Created { tab_id, .. }
            | Self::Loaded { tab_id }
            | Self::Updated { tab_id, .. }
            | Self::Activated { tab_id }
            | Self::Replaced { tab_id, .. }
            | Self::Removed { tab_id } => tab_id,
        }
    }
}

// ============================================================================
// Observation
// ============================================================================

/// A notification the tracker decided to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Source tab.
    pub tab_id: TabId,
    /// Kind to encode.
    pub kind: EventKind,
    /// Tab was not active when the notification arrived.
    pub background: bool,
}

// ============================================================================
// TabTracker
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct TabState {
    last_seen_ms: u64,
    created_ms: Option<u64>,
}

/// Per-session tab bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct TabTracker {
    tabs: FxHashMap<TabId, TabState>,
    active: Option<TabId>,
    log_activated: bool,
    lifetimes_ms: VecDeque<u64>,
    open_samples: VecDeque<usize>,
}

impl TabTracker {
    /// Creates an empty tracker.
    #[inline]
    #[must_use]
    pub fn new(log_activated: bool) -> Self {
        Self {
            log_activated,
            ..Self::default()
        }
    }

    /// Registers tabs already open at startup.
    ///
    /// Seeded tabs have no known creation time, so their removal adds no
    /// lifetime sample.
    pub fn seed(&mut self, tabs: impl IntoIterator<Item = TabId>, now_ms: u64) {
        for tab_id in tabs {
            self.tabs.insert(
                tab_id,
                TabState {
                    last_seen_ms: now_ms,
                    created_ms: None,
                },
            );
        }
    }

    /// Applies a notification and returns what to record, if anything.
    pub fn observe(&mut self, event: TabEvent, now_ms: u64) -> Option<Observation> {
        let tab_id = event.tab_id();
        let prior_active = self.active;

        let kind = match event {
            TabEvent::Created { active, .. } => {
                self.tabs.insert(
                    tab_id,
                    TabState {
                        last_seen_ms: now_ms,
                        created_ms: Some(now_ms),
                    },
                );
                if active {
                    self.active = Some(tab_id);
                }
                Some(EventKind::Created)
            }
            TabEvent::Loaded { .. } => Some(EventKind::Loaded),
            TabEvent::Updated { loading, .. } => {
                let known = self.touch(tab_id, now_ms);
                (!known || loading).then_some(EventKind::Updated)
            }
            TabEvent::Activated { .. } => {
                self.active = Some(tab_id);
                self.touch(tab_id, now_ms);
                self.log_activated.then_some(EventKind::Updated)
            }
            TabEvent::Replaced {
                replaced_tab_id, ..
            } => {
                let previous = self.tabs.remove(&replaced_tab_id);
                self.tabs.insert(
                    tab_id,
                    TabState {
                        last_seen_ms: now_ms,
                        created_ms: previous.and_then(|state| state.created_ms),
                    },
                );
                if self.active == Some(replaced_tab_id) {
                    self.active = Some(tab_id);
                }
                Some(EventKind::Replaced)
            }
            TabEvent::Removed { .. } => {
                if let Some(created_ms) = self.tabs.remove(&tab_id).and_then(|s| s.created_ms) {
                    push_bounded(&mut self.lifetimes_ms, now_ms.saturating_sub(created_ms));
                }
                if self.active == Some(tab_id) {
                    self.active = None;
                }
                Some(EventKind::Removed)
            }
        };

        // A removed tab is judged against the active tab before removal.
        let active = match event {
            TabEvent::Removed { .. } => prior_active,
            _ => self.active,
        };
        let background = active.is_some_and(|active| active != tab_id);

        trace!(%tab_id, ?event, recorded = kind.is_some(), "Tab event observed");

        kind.map(|kind| Observation {
            tab_id,
            kind,
            background,
        })
    }

    /// Records the current number of open tabs as a sample.
    pub fn sample_open_tabs(&mut self) {
        push_bounded(&mut self.open_samples, self.tabs.len());
    }

    /// Returns the number of tracked open tabs.
    #[inline]
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.tabs.len()
    }

    /// Returns the active tab, if known.
    #[inline]
    #[must_use]
    pub fn active(&self) -> Option<TabId> {
        self.active
    }

    /// Returns the time a tab was last seen active or updated.
    #[must_use]
    pub fn last_seen_ms(&self, tab_id: TabId) -> Option<u64> {
        self.tabs.get(&tab_id).map(|state| state.last_seen_ms)
    }

    /// Returns the most recent tab lifetimes in milliseconds.
    #[inline]
    #[must_use]
    pub fn lifetimes_ms(&self) -> &VecDeque<u64> {
        &self.lifetimes_ms
    }

    /// Returns the most recent open-tab count samples.
    #[inline]
    #[must_use]
    pub fn open_samples(&self) -> &VecDeque<usize> {
        &self.open_samples
    }

    /// Updates the last-seen time. Returns `true` if the tab was known.
    fn touch(&mut self, tab_id: TabId, now_ms: u64) -> bool {
        match self.tabs.get_mut(&tab_id) {
            Some(state) => {
                state.last_seen_ms = now_ms;
                true
            }
            None => {
                self.tabs.insert(
                    tab_id,
                    TabState {
                        last_seen_ms: now_ms,
                        created_ms: None,
                    },
                );
                false
            }
        }
    }
}

fn push_bounded<T>(samples: &mut VecDeque<T>, value: T) {
    if samples.len() == MAX_SAMPLES {
        samples.pop_front();
    }
    samples.push_back(value);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: u32) -> TabId {
        TabId::new(id)
    }

    #[test]
    fn test_created_always_recorded() {
        let mut tracker = TabTracker::new(false);
        let obs = tracker
            .observe(
                TabEvent::Created {
                    tab_id: tab(1),
                    active: true,
                },
                0,
            )
            .unwrap();

        assert_eq!(obs.kind, EventKind::Created);
        assert!(!obs.background);
        assert_eq!(tracker.active(), Some(tab(1)));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn test_update_rules() {
        let mut tracker = TabTracker::new(false);

        // unknown tab: recorded even when not loading
        let first = tracker.observe(
            TabEvent::Updated {
                tab_id: tab(4),
                loading: false,
            },
            10,
        );
        assert_eq!(first.map(|o| o.kind), Some(EventKind::Updated));

        // known tab, not loading: skipped but touched
        let second = tracker.observe(
            TabEvent::Updated {
                tab_id: tab(4),
                loading: false,
            },
            20,
        );
        assert!(second.is_none());
        assert_eq!(tracker.last_seen_ms(tab(4)), Some(20));

        // known tab, loading: recorded
        let third = tracker.observe(
            TabEvent::Updated {
                tab_id: tab(4),
                loading: true,
            },
            30,
        );
        assert!(third.is_some());
    }

    #[test]
    fn test_activation_not_recorded_by_default() {
        let mut tracker = TabTracker::new(false);
        assert!(tracker.observe(TabEvent::Activated { tab_id: tab(2) }, 5).is_none());
        assert_eq!(tracker.active(), Some(tab(2)));

        let mut logging = TabTracker::new(true);
        let obs = logging.observe(TabEvent::Activated { tab_id: tab(2) }, 5).unwrap();
        assert_eq!(obs.kind, EventKind::Updated);
        assert!(!obs.background);
    }

    #[test]
    fn test_background_flag() {
        let mut tracker = TabTracker::new(false);
        tracker.observe(TabEvent::Activated { tab_id: tab(1) }, 0);

        let obs = tracker.observe(TabEvent::Loaded { tab_id: tab(9) }, 1).unwrap();
        assert!(obs.background);

        let obs = tracker.observe(TabEvent::Loaded { tab_id: tab(1) }, 2).unwrap();
        assert!(!obs.background);
    }

    #[test]
    fn test_removed_records_lifetime() {
        let mut tracker = TabTracker::new(false);
        tracker.observe(
            TabEvent::Created {
                tab_id: tab(3),
                active: true,
            },
            1_000,
        );
        let obs = tracker.observe(TabEvent::Removed { tab_id: tab(3) }, 61_000).unwrap();

        assert_eq!(obs.kind, EventKind::Removed);
        assert_eq!(tracker.lifetimes_ms().iter().copied().collect::<Vec<_>>(), vec![60_000]);
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.active(), None);
    }

    #[test]
    fn test_seeded_tab_has_no_lifetime() {
        let mut tracker = TabTracker::new(false);
        tracker.seed([tab(1), tab(2)], 0);
        assert_eq!(tracker.open_count(), 2);

        tracker.observe(TabEvent::Removed { tab_id: tab(1) }, 500);
        assert!(tracker.lifetimes_ms().is_empty());
    }

    #[test]
    fn test_replaced_keeps_creation_time() {
        let mut tracker = TabTracker::new(false);
        tracker.observe(
            TabEvent::Created {
                tab_id: tab(5),
                active: true,
            },
            100,
        );
        let obs = tracker
            .observe(
                TabEvent::Replaced {
                    tab_id: tab(6),
                    replaced_tab_id: tab(5),
                },
                200,
            )
            .unwrap();
        assert_eq!(obs.kind, EventKind::Replaced);
        assert_eq!(tracker.active(), Some(tab(6)));

        tracker.observe(TabEvent::Removed { tab_id: tab(6) }, 1_100);
        assert_eq!(tracker.lifetimes_ms().back(), Some(&1_000));
    }

    #[test]
    fn test_samples_are_bounded() {
        let mut tracker = TabTracker::new(false);
        for i in 0..(MAX_SAMPLES as u32 + 20) {
            tracker.seed([tab(i)], 0);
            tracker.sample_open_tabs();
        }

        assert_eq!(tracker.open_samples().len(), MAX_SAMPLES);
        assert_eq!(tracker.open_samples().front(), Some(&21));
    }
}
