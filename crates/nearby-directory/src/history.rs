//! Search history
//!
//! Keeps the user's past searches so the client can offer them again.

use chrono::{DateTime, Utc};
use nearby_core::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// A past search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub id: String,
    pub query: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub timestamp: DateTime<Utc>,
}

/// Bounded log of searches, oldest evicted first
pub struct SearchHistory {
    entries: VecDeque<SearchHistoryEntry>,
    max_entries: usize,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::with_max_entries(100)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max.max(1),
        }
    }

    /// Record a search; returns the entry id
    pub fn record(&mut self, query: impl Into<String>, kind: ProviderKind) -> String {
        let entry = SearchHistoryEntry {
            id: generate_search_id(),
            query: query.into(),
            kind,
            timestamp: Utc::now(),
        };
        let id = entry.id.clone();
        self.entries.push_back(entry);

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        id
    }

    /// Newest first, at most `limit` entries
    pub fn recent(&self, limit: usize) -> Vec<SearchHistoryEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for SearchHistory {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_search_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let millis = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("search_{:x}_{:04x}", millis, counter % 0xFFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_is_newest_first() {
        let mut history = SearchHistory::new();
        history.record("milk", ProviderKind::Product);
        history.record("plumber", ProviderKind::Service);
        history.record("bread", ProviderKind::Product);

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "bread");
        assert_eq!(recent[1].query, "plumber");
        assert_eq!(recent[1].kind, ProviderKind::Service);
    }

    #[test]
    fn test_max_entries() {
        let mut history = SearchHistory::with_max_entries(5);
        for i in 0..10 {
            history.record(format!("query{}", i), ProviderKind::Product);
        }

        // Should only keep last 5
        assert_eq!(history.len(), 5);
        assert_eq!(history.recent(1)[0].query, "query9");
        assert_eq!(history.recent(10).last().unwrap().query, "query5");
    }

    #[test]
    fn test_ids_are_unique() {
        let mut history = SearchHistory::new();
        let a = history.record("milk", ProviderKind::Product);
        let b = history.record("milk", ProviderKind::Product);
        assert_ne!(a, b);
    }
}
