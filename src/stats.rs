//! Usage statistics shown to the user.
//!
//! Counts come from the history log, averages from the tracker's bounded
//! samples. Every figure that has no data is `None` rather than zero.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::codec::EventKind;
use crate::storage::LogEntry;
use crate::tracker::TabTracker;

// ============================================================================
// UsageStats
// ============================================================================

/// Summary of tab usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Tabs created.
    pub created: usize,
    /// Tabs removed.
    pub removed: usize,
    /// Removed per created, rounded to two decimals.
    pub ratio: Option<f64>,
    /// Average number of open tabs over recent samples.
    pub open_tabs: Option<f64>,
    /// Average tab lifetime in seconds over recent closures.
    pub lifetime_secs: Option<f64>,
}

impl UsageStats {
    /// Computes statistics from log entries and tracker samples.
    #[must_use]
    pub fn collect(entries: &[LogEntry], tracker: &TabTracker) -> Self {
        let created = count_kind(entries, EventKind::Created);
        let removed = count_kind(entries, EventKind::Removed);

        let ratio = (created > 0).then(|| round2(removed as f64 / created as f64));

        let open_tabs = average(tracker.open_samples().iter().map(|&n| n as f64));
        let lifetime_secs =
            average(tracker.lifetimes_ms().iter().map(|&ms| ms as f64)).map(|ms| ms / 1000.0);

        Self {
            created,
            removed,
            ratio,
            open_tabs,
            lifetime_secs,
        }
    }
}

fn count_kind(entries: &[LogEntry], kind: EventKind) -> usize {
    entries.iter().filter(|entry| entry.kind == kind).count()
}

fn average(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    Some(values.sum::<f64>() / len as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::TabId;
    use crate::tracker::TabEvent;

    fn entry(kind: EventKind) -> LogEntry {
        LogEntry {
            tab_id: TabId::new(1),
            kind,
            offset_ms: 0,
        }
    }

    #[test]
    fn test_empty() {
        let stats = UsageStats::collect(&[], &TabTracker::default());
        assert_eq!(stats.created, 0);
        assert_eq!(stats.removed, 0);
        assert!(stats.ratio.is_none());
        assert!(stats.open_tabs.is_none());
        assert!(stats.lifetime_secs.is_none());
    }

    #[test]
    fn test_counts_and_ratio() {
        let entries = [
            entry(EventKind::Created),
            entry(EventKind::Created),
            entry(EventKind::Created),
            entry(EventKind::Loaded),
            entry(EventKind::Removed),
        ];
        let stats = UsageStats::collect(&entries, &TabTracker::default());

        assert_eq!(stats.created, 3);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.ratio, Some(0.33));
    }

    #[test]
    fn test_tracker_averages() {
        let mut tracker = TabTracker::new(false);
        tracker.seed([TabId::new(1), TabId::new(2)], 0);
        tracker.sample_open_tabs();
        tracker.observe(
            TabEvent::Created {
                tab_id: TabId::new(3),
                active: false,
            },
            0,
        );
        tracker.sample_open_tabs();
        tracker.observe(TabEvent::Removed { tab_id: TabId::new(3) }, 4_500);

        let stats = UsageStats::collect(&[], &tracker);
        assert_eq!(stats.open_tabs, Some(2.5));
        assert_eq!(stats.lifetime_secs, Some(4.5));
    }

    #[test]
    fn test_serializes_camel_case() {
        let stats = UsageStats::collect(&[], &TabTracker::default());
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("lifetimeSecs").is_some());
        assert!(json.get("openTabs").is_some());
    }
}
