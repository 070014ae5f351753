//! Margin history tracker
//!
//! Append-only per-security time series of past opportunity margins, read by
//! the flip heuristic to spot oscillation. Entries are signed relative to the
//! main venue (see the matcher) and time-ordered by insertion. Unlike the
//! behaviour this replaces, the series is bounded: the oldest entries are
//! evicted once a security exceeds [`DEFAULT_HISTORY_CAP`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Maximum retained margin entries per security.
pub const DEFAULT_HISTORY_CAP: usize = 512;

/// One recorded arbitrage margin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarginEntry {
    /// Opportunity margin, sign-flipped when the crossing ask came from the
    /// alternate venue.
    pub margin: f64,
    /// Monotonic milliseconds at discovery.
    pub at_ms: f64,
}

/// Per-security margin time series with a retention cap.
#[derive(Debug, Clone)]
pub struct MarginHistory {
    per_security: HashMap<String, VecDeque<MarginEntry>>,
    cap: usize,
}

impl Default for MarginHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl MarginHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            per_security: HashMap::new(),
            cap: cap.max(1),
        }
    }

    /// Append one entry for `security`, evicting the oldest past the cap.
    pub fn record(&mut self, security: &str, margin: f64, at_ms: f64) {
        let series = self
            .per_security
            .entry(security.to_string())
            .or_default();
        if series.len() >= self.cap {
            series.pop_front();
        }
        series.push_back(MarginEntry { margin, at_ms });
    }

    /// The recorded series for `security`, oldest first. Empty when the
    /// security has never produced an opportunity.
    pub fn entries(&self, security: &str) -> Vec<MarginEntry> {
        self.per_security
            .get(security)
            .map(|series| series.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, security: &str) -> usize {
        self.per_security.get(security).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.per_security.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_time_ordered() {
        let mut history = MarginHistory::default();
        history.record("CRZY", 2.0, 1_000.0);
        history.record("CRZY", -1.0, 1_001.0);
        let entries = history.entries("CRZY");
        assert_eq!(entries.len(), 2);
        assert!(entries[0].at_ms <= entries[1].at_ms);
    }

    #[test]
    fn eviction_drops_oldest_entries() {
        let mut history = MarginHistory::new(3);
        for i in 0..5 {
            history.record("CRZY", i as f64, 1_000.0 + i as f64);
        }
        let entries = history.entries("CRZY");
        assert_eq!(entries.len(), 3);
        assert!((entries[0].margin - 2.0).abs() < 1e-9);
        assert!((entries[2].margin - 4.0).abs() < 1e-9);
    }

    #[test]
    fn securities_are_tracked_independently() {
        let mut history = MarginHistory::default();
        history.record("CRZY", 2.0, 1_000.0);
        assert_eq!(history.len("CRZY"), 1);
        assert_eq!(history.len("TAME"), 0);
    }
}
