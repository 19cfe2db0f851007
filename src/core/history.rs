//! Bounded record of committed state transitions.
//!
//! Instances are driven in tight poll loops, so the history keeps only the
//! most recent transitions and drops the oldest once full.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of transitions retained per instance.
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// What caused a committed transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionCause {
    /// The driver followed the state's normal entry.
    Normal,
    /// The driver followed the state's timeout entry.
    TimedOut,
    /// A handler or the host called `force_state`.
    Forced,
}

impl TransitionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionCause::Normal => "normal",
            TransitionCause::TimedOut => "timed_out",
            TransitionCause::Forced => "forced",
        }
    }
}

/// One committed transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Row the instance left.
    pub from: usize,
    /// Row the instance entered.
    pub to: usize,
    pub cause: TransitionCause,
    /// Driver run count when the transition was committed.
    pub run: u64,
    /// Wall-clock time of the commit, for diagnostics only.
    pub at: DateTime<Utc>,
}

/// Ring of the most recent transitions, oldest first.
///
/// # Example
///
/// ```rust
/// use tablefsm::core::{StateHistory, TransitionCause, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = StateHistory::with_capacity(2);
/// for (from, to) in [(0, 1), (1, 2), (2, 0)] {
///     history.record(TransitionRecord {
///         from,
///         to,
///         cause: TransitionCause::Normal,
///         run: 0,
///         at: Utc::now(),
///     });
/// }
///
/// // Oldest record dropped.
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.path(), vec![1, 2, 0]);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateHistory {
    capacity: usize,
    records: VecDeque<TransitionRecord>,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// A capacity of zero disables recording.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, record: TransitionRecord) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows traversed by the retained records: the first record's `from`,
    /// then every `to`.
    pub fn path(&self) -> Vec<usize> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.front() {
            path.push(first.from);
        }
        path.extend(self.records.iter().map(|r| r.to));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: usize, to: usize, run: u64) -> TransitionRecord {
        TransitionRecord {
            from,
            to,
            cause: TransitionCause::Normal,
            run,
            at: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
        assert!(history.path().is_empty());
    }

    #[test]
    fn record_preserves_order() {
        let mut history = StateHistory::new();
        history.record(record(0, 1, 1));
        history.record(record(1, 2, 2));

        let runs: Vec<u64> = history.records().map(|r| r.run).collect();
        assert_eq!(runs, vec![1, 2]);
        assert_eq!(history.path(), vec![0, 1, 2]);
        assert_eq!(history.last().map(|r| r.to), Some(2));
    }

    #[test]
    fn full_history_drops_oldest() {
        let mut history = StateHistory::with_capacity(3);
        for run in 0..5 {
            history.record(record(0, 1, run));
        }
        assert_eq!(history.len(), 3);
        let runs: Vec<u64> = history.records().map(|r| r.run).collect();
        assert_eq!(runs, vec![2, 3, 4]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut history = StateHistory::with_capacity(0);
        history.record(record(0, 1, 1));
        assert!(history.is_empty());
    }

    #[test]
    fn cause_names_are_stable() {
        assert_eq!(TransitionCause::Normal.as_str(), "normal");
        assert_eq!(TransitionCause::TimedOut.as_str(), "timed_out");
        assert_eq!(TransitionCause::Forced.as_str(), "forced");
    }
}
