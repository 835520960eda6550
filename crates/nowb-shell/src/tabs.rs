//! Tab strip with lazily materialized tabs
//!
//! A tab either owns a live engine view or is a placeholder carrying only
//! its URL and title. Placeholders come from session restore and turn into
//! live tabs once, the first time they are activated. The conversion is
//! split into [`TabStrip::begin_materialize`] and
//! [`TabStrip::complete_materialize`] so that an activation signal fired
//! while the view is being created finds the tab already claimed.

use crate::session::TabPlan;
use nowb_core::types::TabId;
use nowb_core::{NowbError, NowbResult};
use serde::Serialize;

/// Creates engine views on behalf of the tab strip
pub trait ViewFactory {
    type View;

    fn create_view(&mut self, url: &str) -> NowbResult<Self::View>;
}

#[derive(Debug)]
pub enum TabState<V> {
    Placeholder,
    /// A view is being created for this tab
    Materializing,
    Live(V),
}

#[derive(Debug)]
pub struct Tab<V> {
    pub id: TabId,
    pub url: String,
    pub title: String,
    state: TabState<V>,
}

impl<V> Tab<V> {
    fn live(url: String, title: String, view: V) -> Self {
        Self {
            id: TabId::new(),
            url,
            title,
            state: TabState::Live(view),
        }
    }

    fn placeholder(url: String, title: String) -> Self {
        Self {
            id: TabId::new(),
            url,
            title,
            state: TabState::Placeholder,
        }
    }

    pub fn state(&self) -> &TabState<V> {
        &self.state
    }

    pub fn view(&self) -> Option<&V> {
        match &self.state {
            TabState::Live(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        !matches!(self.state, TabState::Live(_))
    }
}

/// Claim on a placeholder, handed out once by [`TabStrip::begin_materialize`]
#[derive(Debug)]
pub struct MaterializeTicket {
    id: TabId,
    url: String,
}

impl MaterializeTicket {
    pub fn tab_id(&self) -> TabId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// What the host needs to draw a tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabSummary {
    pub id: TabId,
    pub index: usize,
    pub url: String,
    pub title: String,
    pub placeholder: bool,
    pub active: bool,
}

#[derive(Debug)]
pub struct TabStrip<V> {
    tabs: Vec<Tab<V>>,
    active: Option<usize>,
}

impl<V> Default for TabStrip<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TabStrip<V> {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            active: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> &[Tab<V>] {
        &self.tabs
    }

    pub fn get(&self, index: usize) -> Option<&Tab<V>> {
        self.tabs.get(index)
    }

    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Tab<V>> {
        self.active.and_then(|index| self.tabs.get(index))
    }

    /// URLs of every tab in order, placeholders included
    pub fn urls(&self) -> Vec<String> {
        self.tabs.iter().map(|tab| tab.url.clone()).collect()
    }

    /// URLs of tabs that own a live view
    pub fn live_urls(&self) -> Vec<String> {
        self.tabs
            .iter()
            .filter(|tab| !tab.is_placeholder())
            .map(|tab| tab.url.clone())
            .collect()
    }

    pub fn summaries(&self) -> Vec<TabSummary> {
        self.tabs
            .iter()
            .enumerate()
            .map(|(index, tab)| TabSummary {
                id: tab.id,
                index,
                url: tab.url.clone(),
                title: tab.title.clone(),
                placeholder: tab.is_placeholder(),
                active: self.active == Some(index),
            })
            .collect()
    }

    /// Build tabs from a restore plan, appending to any existing tabs
    pub fn restore<F>(&mut self, plan: Vec<TabPlan>, factory: &mut F) -> Vec<TabId>
    where
        F: ViewFactory<View = V>,
    {
        let first_new = self.tabs.len();
        let mut ids = Vec::with_capacity(plan.len());

        for entry in plan {
            let tab = match entry {
                TabPlan::Materialized { url, title } => match factory.create_view(&url) {
                    Ok(view) => Tab::live(url, title, view),
                    Err(e) => {
                        log::warn!("Failed to create view for {}: {}, deferring", url, e);
                        Tab::placeholder(url, title)
                    }
                },
                TabPlan::Placeholder { url, title } => Tab::placeholder(url, title),
            };
            ids.push(tab.id);
            self.tabs.push(tab);
        }

        if self.active.is_none() && self.tabs.len() > first_new {
            self.active = Some(first_new);
        }

        log::info!("Restored {} tabs", ids.len());
        ids
    }

    /// Open a new live tab at the end and make it active
    pub fn open<F>(&mut self, url: &str, title: &str, factory: &mut F) -> NowbResult<TabId>
    where
        F: ViewFactory<View = V>,
    {
        let view = factory.create_view(url)?;
        let tab = Tab::live(url.to_string(), title.to_string(), view);
        let id = tab.id;
        self.tabs.push(tab);
        self.active = Some(self.tabs.len() - 1);
        log::debug!("Opened {} at {}", id, url);
        Ok(id)
    }

    /// Remove a tab and hand it back so the host can tear down its view
    pub fn close(&mut self, index: usize) -> NowbResult<Tab<V>> {
        if index >= self.tabs.len() {
            return Err(NowbError::tab(format!("No tab at index {}", index)));
        }
        let tab = self.tabs.remove(index);

        self.active = match self.active {
            _ if self.tabs.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) if active == index => Some(index.min(self.tabs.len() - 1)),
            other => other,
        };

        log::debug!("Closed {}", tab.id);
        Ok(tab)
    }

    /// Record a navigation reported by the engine
    pub fn navigated(&mut self, id: TabId, url: &str, title: Option<&str>) -> NowbResult<()> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|tab| tab.id == id)
            .ok_or_else(|| NowbError::not_found(id.to_string()))?;
        tab.url = url.to_string();
        if let Some(title) = title {
            tab.title = title.to_string();
        }
        Ok(())
    }

    /// Claim a placeholder for conversion.
    ///
    /// Returns `None` when the tab is already live or already being
    /// converted, which makes a repeated activation a no-op.
    pub fn begin_materialize(&mut self, id: TabId) -> Option<MaterializeTicket> {
        let tab = self.tabs.iter_mut().find(|tab| tab.id == id)?;
        match tab.state {
            TabState::Placeholder => {
                tab.state = TabState::Materializing;
                Some(MaterializeTicket {
                    id,
                    url: tab.url.clone(),
                })
            }
            TabState::Materializing | TabState::Live(_) => None,
        }
    }

    /// Finish a conversion. The tab keeps its index.
    ///
    /// On failure the tab goes back to being a placeholder so a later
    /// activation can retry.
    pub fn complete_materialize(
        &mut self,
        ticket: MaterializeTicket,
        view: NowbResult<V>,
    ) -> NowbResult<usize> {
        let index = self
            .index_of(ticket.id)
            .ok_or_else(|| NowbError::not_found(ticket.id.to_string()))?;
        let tab = &mut self.tabs[index];

        match view {
            Ok(view) => {
                tab.state = TabState::Live(view);
                log::info!("Materialized {} at index {}", ticket.id, index);
                Ok(index)
            }
            Err(e) => {
                tab.state = TabState::Placeholder;
                Err(e)
            }
        }
    }

    /// Convert a placeholder in one call. Returns `Ok(false)` when there was
    /// nothing to do.
    pub fn materialize<F>(&mut self, id: TabId, factory: &mut F) -> NowbResult<bool>
    where
        F: ViewFactory<View = V>,
    {
        if self.index_of(id).is_none() {
            return Err(NowbError::not_found(id.to_string()));
        }
        let Some(ticket) = self.begin_materialize(id) else {
            return Ok(false);
        };
        let view = factory.create_view(ticket.url());
        self.complete_materialize(ticket, view)?;
        Ok(true)
    }

    /// Select a tab, materializing it if needed.
    /// Returns whether a placeholder was converted.
    pub fn activate<F>(&mut self, index: usize, factory: &mut F) -> NowbResult<bool>
    where
        F: ViewFactory<View = V>,
    {
        let id = self
            .tabs
            .get(index)
            .map(|tab| tab.id)
            .ok_or_else(|| NowbError::tab(format!("No tab at index {}", index)))?;
        self.active = Some(index);
        self.materialize(id, factory)
    }
}
