//! Session capture and restore
//!
//! At shutdown the live window state is folded into the settings document;
//! at startup the saved tab list is turned into a restore plan with one
//! live tab and placeholders for the rest.

use nowb_core::types::WindowGeometry;
use nowb_settings::SettingsDocument;
use serde::{Deserialize, Serialize};
use url::Url;

/// Title for placeholders whose URL has no host
pub const PLACEHOLDER_TITLE: &str = "Waiting to load...";

/// Title for the tab opened at the home page
pub const HOME_TITLE: &str = "Home";

/// How a restored tab should be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TabPlan {
    Materialized { url: String, title: String },
    Placeholder { url: String, title: String },
}

impl TabPlan {
    pub fn materialized(url: impl Into<String>, title: impl Into<String>) -> Self {
        TabPlan::Materialized {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Placeholder titled with the URL's host
    pub fn placeholder(url: impl Into<String>) -> Self {
        let url = url.into();
        let title = placeholder_title(&url);
        TabPlan::Placeholder { url, title }
    }

    pub fn url(&self) -> &str {
        match self {
            TabPlan::Materialized { url, .. } | TabPlan::Placeholder { url, .. } => url,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, TabPlan::Placeholder { .. })
    }
}

fn placeholder_title(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string())
}

/// Window state as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    /// Open tab URLs in strip order, placeholders included
    #[serde(default)]
    pub tab_urls: Vec<String>,
    #[serde(default)]
    pub geometry: Option<WindowGeometry>,
    #[serde(default)]
    pub search_engine_url: Option<String>,
    #[serde(default)]
    pub splitter_sizes: Option<Vec<u32>>,
}

/// Document fields to overwrite after a capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionUpdate {
    pub geometry: Option<WindowGeometry>,
    pub search_engine_url: Option<String>,
    pub splitter_sizes: Option<Vec<u32>>,
    pub last_session: Option<Vec<String>>,
}

impl SessionUpdate {
    pub fn apply_to(&self, document: &mut SettingsDocument) {
        if let Some(geometry) = &self.geometry {
            document.set_window_geometry(geometry);
        }
        if let Some(url) = &self.search_engine_url {
            document.set_current_search_engine_url(url.clone());
        }
        if let Some(sizes) = &self.splitter_sizes {
            document.set_splitter_sizes(sizes.clone());
        }
        if let Some(urls) = &self.last_session {
            document.set_last_session(urls.clone());
        }
    }
}

pub struct SessionReconciler;

impl SessionReconciler {
    /// Turn live state into a document update.
    ///
    /// Geometry is skipped while maximized or fullscreen so a transient size
    /// never becomes the restore size. Tab URLs are captured only when
    /// session restore is enabled.
    pub fn capture(live: &LiveState, restore_enabled: bool) -> SessionUpdate {
        SessionUpdate {
            geometry: live.geometry.filter(WindowGeometry::is_restorable),
            search_engine_url: live.search_engine_url.clone(),
            splitter_sizes: live.splitter_sizes.clone(),
            last_session: restore_enabled.then(|| live.tab_urls.clone()),
        }
    }

    /// Plan the startup tabs for a document
    pub fn plan(document: &SettingsDocument) -> Vec<TabPlan> {
        Self::plan_urls(
            document.last_session(),
            document.restore_last_session(),
            document.home_url(),
        )
    }

    /// First URL live, the rest placeholders. Nothing to restore means a
    /// single live tab at the home page.
    pub fn plan_urls(urls: &[String], restore_enabled: bool, home_url: &str) -> Vec<TabPlan> {
        let urls: Vec<&String> = urls.iter().filter(|url| !url.trim().is_empty()).collect();

        match urls.split_first() {
            Some((first, rest)) if restore_enabled => {
                let mut plan = Vec::with_capacity(rest.len() + 1);
                plan.push(TabPlan::materialized(
                    first.as_str(),
                    placeholder_title(first),
                ));
                plan.extend(rest.iter().map(|url| TabPlan::placeholder(url.as_str())));
                plan
            }
            _ => vec![TabPlan::materialized(home_url, HOME_TITLE)],
        }
    }
}
