//! Bounded recent-values window per (device, sensor).
//!
//! Only change and pattern conditions read history, and patterns look at
//! most [`PATTERN_WINDOW`](crate::condition::PATTERN_WINDOW) entries back,
//! so a small fixed capacity is sufficient. Oldest entries are evicted
//! first.

use std::collections::VecDeque;

use crate::types::Timestamp;

/// Maximum number of retained readings.
pub const HISTORY_CAPACITY: usize = 5;

/// A bounded FIFO of recent readings for one sensor, newest last.
#[derive(Debug, Clone, Default)]
pub struct ValueHistory {
    entries: VecDeque<(Timestamp, f64)>,
}

impl ValueHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading, evicting the oldest entry once at capacity.
    pub fn push(&mut self, recorded_at: Timestamp, value: f64) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back((recorded_at, value));
    }

    /// Drop entries recorded before `cutoff`.
    ///
    /// Entries are ordered oldest-first, so eviction stops at the first
    /// entry inside the window.
    pub fn evict_older_than(&mut self, cutoff: Timestamp) {
        while let Some((recorded_at, _)) = self.entries.front() {
            if *recorded_at < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// The retained values, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut history = ValueHistory::new();
        let now = Utc::now();
        for i in 0..8 {
            history.push(now + Duration::seconds(i), i as f64);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.values(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn evicts_by_timestamp() {
        let mut history = ValueHistory::new();
        let now = Utc::now();
        history.push(now - Duration::minutes(20), 1.0);
        history.push(now - Duration::minutes(10), 2.0);
        history.push(now - Duration::minutes(1), 3.0);

        history.evict_older_than(now - Duration::minutes(15));
        assert_eq!(history.values(), vec![2.0, 3.0]);

        history.evict_older_than(now);
        assert!(history.is_empty());
    }
}
