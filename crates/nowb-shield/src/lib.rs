//! Ad blocking for NOWB
//!
//! Requests are blocked when any rule occurs as a substring of the URL.

pub mod rules;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub use rules::{
    default_rules, load_rules, parse_rules, save_rules, RuleList, RuleSource, DEFAULT_RULES,
};

pub struct AdBlocker {
    rules: Vec<String>,
    enabled: bool,
    requests_checked: AtomicU64,
    requests_blocked: AtomicU64,
}

impl AdBlocker {
    /// Blocker with the built-in rules
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<String>) -> Self {
        log::info!("Initializing ad blocker with {} rules", rules.len());

        Self {
            rules,
            enabled: true,
            requests_checked: AtomicU64::new(0),
            requests_blocked: AtomicU64::new(0),
        }
    }

    pub fn from_rule_list(list: RuleList) -> Self {
        Self::with_rules(list.rules)
    }

    /// Replace the rule set and reset the counters
    pub fn load_rules(&mut self, rules: Vec<String>) {
        log::info!("Reloading ad blocker with {} rules", rules.len());
        self.rules = rules;
        self.requests_checked.store(0, Ordering::Relaxed);
        self.requests_blocked.store(0, Ordering::Relaxed);
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    /// Add a rule unless it is blank or already present
    pub fn add_rule(&mut self, rule: &str) -> bool {
        let rule = rule.trim();
        if rule.is_empty() || rule.starts_with('#') || self.rules.iter().any(|r| r == rule) {
            return false;
        }
        self.rules.push(rule.to_string());
        true
    }

    pub fn remove_rule(&mut self, rule: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r != rule);
        self.rules.len() != before
    }

    /// First rule that matches `url`, ignoring the enabled flag
    pub fn matching_rule(&self, url: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| !rule.is_empty() && url.contains(rule.as_str()))
            .map(String::as_str)
    }

    /// Check if a request should be blocked
    pub fn should_block(&self, url: &str) -> bool {
        if !self.enabled {
            return false;
        }

        self.requests_checked.fetch_add(1, Ordering::Relaxed);
        match self.matching_rule(url) {
            Some(rule) => {
                log::debug!("Blocked: {} (rule {})", url, rule);
                self.requests_blocked.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::info!(
            "Ad blocking {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get_stats(&self) -> BlockingStats {
        BlockingStats {
            requests_checked: self.requests_checked.load(Ordering::Relaxed),
            requests_blocked: self.requests_blocked.load(Ordering::Relaxed),
            rule_count: self.rules.len(),
        }
    }
}

impl Default for AdBlocker {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about blocked requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockingStats {
    pub requests_checked: u64,
    pub requests_blocked: u64,
    pub rule_count: usize,
}
