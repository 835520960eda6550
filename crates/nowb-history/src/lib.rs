//! NOWB browsing history
//!
//! A bounded visit log. Consecutive visits to the same URL collapse into one
//! entry and the oldest entry is dropped once the log is over capacity.
//! Private logs stay empty forever.

pub mod store;

pub use store::{HistoryLoad, HistoryStore};

use chrono::NaiveDateTime;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use nowb_core::config::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// URLs that never make it into history
const IGNORED_URLS: &[&str] = &["about:blank"];

/// A single visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub url: String,
    pub timestamp: NaiveDateTime,
}

/// Presentation order for [`HistoryLog::list`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    #[default]
    NewestFirst,
    Chronological,
}

#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    private: bool,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            private: false,
        }
    }

    /// A log that never records anything
    pub fn private() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: 0,
            private: true,
        }
    }

    /// Rebuild from stored entries in chronological order, keeping the newest
    pub fn with_entries(entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        for entry in entries {
            log.push(entry);
        }
        log
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Record a visit. Returns whether an entry was added.
    pub fn record(&mut self, title: &str, url: &str, timestamp: NaiveDateTime) -> bool {
        if self.private {
            return false;
        }

        let url = url.trim();
        if url.is_empty() || IGNORED_URLS.contains(&url) {
            return false;
        }

        if self.last().is_some_and(|last| last.url == url) {
            log::trace!("Skipping repeated visit to {}", url);
            return false;
        }

        let title = title.trim();
        let title = if title.is_empty() { url } else { title };

        self.push(HistoryEntry {
            title: title.to_string(),
            url: url.to_string(),
            timestamp,
        });
        true
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn list(&self, order: HistoryOrder) -> Vec<HistoryEntry> {
        match order {
            HistoryOrder::Chronological => self.entries.iter().cloned().collect(),
            HistoryOrder::NewestFirst => self.entries.iter().rev().cloned().collect(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fuzzy search over titles and URLs, best match first
    pub fn search(&self, query: &str, limit: usize) -> Vec<HistoryEntry> {
        let query = query.trim();
        if query.is_empty() {
            return self.list(HistoryOrder::NewestFirst).into_iter().take(limit).collect();
        }

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, usize, &HistoryEntry)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let title = matcher.fuzzy_match(&entry.title, query);
                let url = matcher.fuzzy_match(&entry.url, query);
                title.max(url).map(|score| (score, index, entry))
            })
            .collect();

        // Best score first, newer entries win ties
        results.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        results
            .into_iter()
            .map(|(_, _, entry)| entry.clone())
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = HistoryLog::new(3);
        for i in 0..4 {
            assert!(log.record("", &format!("https://site{}.example", i), at(i)));
        }

        assert_eq!(log.len(), 3);
        let urls: Vec<_> = log
            .list(HistoryOrder::Chronological)
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://site1.example",
                "https://site2.example",
                "https://site3.example"
            ]
        );
        assert_eq!(log.last().unwrap().url, "https://site3.example");
    }

    #[test]
    fn test_adjacent_duplicates_suppressed() {
        let mut log = HistoryLog::default();
        assert!(log.record("A", "https://a.example", at(0)));
        assert!(!log.record("A again", "https://a.example", at(1)));
        assert_eq!(log.len(), 1);

        assert!(log.record("B", "https://b.example", at(2)));
        assert!(log.record("A", "https://a.example", at(3)));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_blank_pages_and_titles() {
        let mut log = HistoryLog::default();
        assert!(!log.record("New Tab", "about:blank", at(0)));
        assert!(!log.record("Nothing", "  ", at(0)));
        assert!(log.record("", "https://untitled.example", at(1)));

        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().title, "https://untitled.example");
    }

    #[test]
    fn test_list_order() {
        let mut log = HistoryLog::default();
        log.record("First", "https://1.example", at(0));
        log.record("Second", "https://2.example", at(1));

        let newest = log.list(HistoryOrder::NewestFirst);
        assert_eq!(newest[0].title, "Second");
        assert_eq!(newest[1].title, "First");

        let oldest = log.list(HistoryOrder::Chronological);
        assert_eq!(oldest[0].title, "First");
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::default();
        log.record("First", "https://1.example", at(0));
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_private_log_stays_empty() {
        let mut log = HistoryLog::private();
        assert!(!log.record("Secret", "https://secret.example", at(0)));
        assert!(log.is_empty());
        assert!(log.is_private());
    }

    #[test]
    fn test_with_entries_truncates_to_newest() {
        let entries = (0..5)
            .map(|i| HistoryEntry {
                title: format!("Page {}", i),
                url: format!("https://{}.example", i),
                timestamp: at(i),
            })
            .collect();

        let log = HistoryLog::with_entries(entries, 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.list(HistoryOrder::Chronological)[0].title, "Page 3");
    }

    #[test]
    fn test_search() {
        let mut log = HistoryLog::default();
        log.record("Rust Programming Language", "https://www.rust-lang.org", at(0));
        log.record("GitHub", "https://github.com", at(1));
        log.record("Docs.rs", "https://docs.rs", at(2));

        let results = log.search("rust", 10);
        assert!(!results.is_empty());
        assert_eq!(results[0].url, "https://www.rust-lang.org");
        assert!(results.iter().all(|e| e.url != "https://github.com"));

        assert_eq!(log.search("", 2).len(), 2);
        assert_eq!(log.search("", 2)[0].title, "Docs.rs");
    }
}
