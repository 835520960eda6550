//! Named tab groups
//!
//! A group remembers the URLs that were open when it was created. Opening it
//! later plans fresh live tabs; existing tabs are never touched.

use crate::session::TabPlan;
use nowb_core::types::TabGroupId;
use nowb_core::{NowbError, NowbResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabGroup {
    pub id: TabGroupId,
    pub name: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TabGroups {
    groups: BTreeMap<TabGroupId, TabGroup>,
    next_id: u64,
}

impl TabGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, name: &str, urls: Vec<String>) -> NowbResult<TabGroupId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NowbError::tab("Group name cannot be empty"));
        }
        if urls.is_empty() {
            return Err(NowbError::tab("Cannot create a group without tabs"));
        }

        let id = TabGroupId(self.next_id);
        self.next_id += 1;

        log::info!("Created tab group {} '{}' with {} tabs", id, name, urls.len());
        self.groups.insert(
            id,
            TabGroup {
                id,
                name: name.to_string(),
                urls,
            },
        );
        Ok(id)
    }

    /// Groups in creation order
    pub fn list(&self) -> Vec<&TabGroup> {
        self.groups.values().collect()
    }

    pub fn get(&self, id: TabGroupId) -> Option<&TabGroup> {
        self.groups.get(&id)
    }

    /// Plans for the group's tabs, all live, to be appended by the host
    pub fn open(&self, id: TabGroupId) -> NowbResult<Vec<TabPlan>> {
        let group = self
            .groups
            .get(&id)
            .ok_or_else(|| NowbError::not_found(id.to_string()))?;

        Ok(group
            .urls
            .iter()
            .map(|url| TabPlan::materialized(url.as_str(), url.as_str()))
            .collect())
    }

    pub fn remove(&mut self, id: TabGroupId) -> Option<TabGroup> {
        self.groups.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
