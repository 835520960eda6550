//! Application state management
//!
//! `AppState` is the single owner of the settings document, the history log
//! and the tab groups for a persistent window. Private windows get a
//! snapshot of the document and never write anything back.

use nowb_core::types::{TabGroupId, TabId};
use nowb_core::{AppConfig, NowbError, NowbResult};
use nowb_history::{HistoryEntry, HistoryLog, HistoryOrder, HistoryStore};
use nowb_settings::{
    ConfigStore, MigrationEngine, MigrationStatus, RawDocument, SettingsDocument,
};
use nowb_shell::{
    LiveState, Resolution, SessionReconciler, SessionUpdate, SharedThemeRegistry, TabGroup,
    TabGroups, TabPlan, TabStrip, TabSummary, ThemeMode, ViewFactory, WindowTheme,
};
use nowb_shield::{load_rules, save_rules, AdBlocker, BlockingStats};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Title used for tabs opened in a private window
const PRIVATE_TAB_TITLE: &str = "Private Tab";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A non-blocking notification for the host to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything the host needs to lay out a window
#[derive(Debug, Clone, Serialize)]
pub struct WindowStatus {
    pub private: bool,
    pub first_run_completed: bool,
    pub settings_path: PathBuf,
    pub theme: ThemeMode,
    pub focus_mode: bool,
    pub home_url: String,
    pub search_engine_name: String,
    pub window_size: [u32; 2],
    pub window_pos: [i32; 2],
    pub splitter_sizes: Vec<u32>,
    pub web_panel_url: String,
    pub web_panel_visible: bool,
    pub custom_css: String,
    pub sleep_mode_enabled: bool,
    pub sleep_mode_interval: u64,
    pub favorite_sites: BTreeMap<String, String>,
    pub adblock_enabled: bool,
}

/// Handle the host binds to a real engine view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ViewHandle(pub u64);

/// Hands out view handles; the host creates the engine instance behind each
#[derive(Debug, Default)]
pub struct HostViewFactory {
    next: u64,
    created: Vec<(ViewHandle, String)>,
}

impl HostViewFactory {
    /// Views created since the last call, for the host to instantiate
    pub fn take_created(&mut self) -> Vec<(ViewHandle, String)> {
        std::mem::take(&mut self.created)
    }
}

impl ViewFactory for HostViewFactory {
    type View = ViewHandle;

    fn create_view(&mut self, url: &str) -> NowbResult<ViewHandle> {
        self.next += 1;
        let handle = ViewHandle(self.next);
        self.created.push((handle, url.to_string()));
        Ok(handle)
    }
}

/// Central application state
pub struct AppState {
    /// Configuration
    pub config: AppConfig,

    store: ConfigStore,
    history_store: HistoryStore,

    /// Settings document; read-only in private windows
    document: SettingsDocument,

    /// Visit history
    pub history: HistoryLog,

    /// User-created tab groups
    pub groups: TabGroups,

    /// Open tabs
    pub tabs: TabStrip<ViewHandle>,

    /// View handle source for the tab strip
    pub views: HostViewFactory,

    /// Ad blocker
    pub shield: AdBlocker,

    /// This window's attachment to the shared theme registry
    theme: WindowTheme,

    /// Focus mode state (runtime, not persisted)
    pub focus_mode: bool,

    notices: Vec<Notice>,
}

impl AppState {
    /// The main window. It creates the theme registry that private
    /// windows opened from it attach to.
    pub fn new(config: AppConfig) -> Self {
        Self::with_theme(config, WindowTheme::standalone())
    }

    /// Load everything from disk. Problems become notices, never errors.
    fn with_theme(config: AppConfig, theme: WindowTheme) -> Self {
        let mut notices = Vec::new();

        if let Err(e) = config.ensure_data_dir() {
            tracing::warn!("Failed to create data directory {:?}: {}", config.data_dir, e);
            notices.push(Notice::warning(format!(
                "Could not create data directory {}: {}",
                config.data_dir.display(),
                e
            )));
        }

        let store = ConfigStore::from_config(&config);
        let loaded = store.load_migrated(&MigrationEngine::new());

        notices.extend(loaded.warnings.iter().map(|w| Notice::warning(w.to_string())));
        match (&loaded.status, &loaded.migration) {
            (MigrationStatus::Newer(version), _) => {
                notices.push(Notice::warning(format!(
                    "Settings were written by a newer version ({}); unknown settings are kept as is",
                    version
                )));
            }
            (_, Some(report)) if report.seeded_defaults => {
                tracing::info!("First run, created default settings");
                notices.push(Notice::info(report.summary()));
            }
            (_, Some(report)) if report.backup_error.is_some() => {
                notices.push(Notice::warning(report.summary()));
            }
            (_, Some(report)) => notices.push(Notice::info(report.summary())),
            _ => {}
        }
        let document = loaded.document;
        tracing::info!(
            "Loaded settings (version {})",
            document
                .settings_version()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let history_store = HistoryStore::from_config(&config);
        let (history, history_warning) = history_store.load_log(config.history_capacity);
        if let Some(warning) = history_warning {
            notices.push(Notice::warning(warning));
        }

        let rule_list = load_rules(&config.adblock_rules_path());
        if let Some(warning) = &rule_list.warning {
            notices.push(Notice::warning(warning.clone()));
        }
        let mut shield = AdBlocker::from_rule_list(rule_list);
        shield.set_enabled(document.adblock_enabled());

        Self {
            config,
            store,
            history_store,
            document,
            history,
            groups: TabGroups::new(),
            tabs: TabStrip::new(),
            views: HostViewFactory::default(),
            shield,
            theme,
            focus_mode: false,
            notices,
        }
    }

    /// A private window seeded from this window's settings
    pub fn private_snapshot(&self) -> Self {
        let config = self.config.clone().private();
        let mut shield = AdBlocker::with_rules(self.shield.rules().to_vec());
        shield.set_enabled(self.shield.is_enabled());

        Self {
            store: ConfigStore::from_config(&config),
            history_store: HistoryStore::from_config(&config),
            config,
            document: self.document.clone(),
            history: HistoryLog::private(),
            groups: TabGroups::new(),
            tabs: TabStrip::new(),
            views: HostViewFactory::default(),
            shield,
            theme: WindowTheme::attach(self.theme.registry()),
            focus_mode: self.focus_mode,
            notices: Vec::new(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.config.mode.is_private()
    }

    pub fn document(&self) -> &SettingsDocument {
        &self.document
    }

    pub fn status(&self) -> WindowStatus {
        let doc = &self.document;
        WindowStatus {
            private: self.is_private(),
            first_run_completed: doc.first_run_completed(),
            settings_path: self.config.settings_path(),
            theme: self.theme(),
            focus_mode: self.focus_mode,
            home_url: doc.home_url().to_string(),
            search_engine_name: doc.search_engine_name(),
            window_size: doc.window_size(),
            window_pos: doc.window_pos(),
            splitter_sizes: doc.splitter_sizes(),
            web_panel_url: doc.web_panel_url().to_string(),
            web_panel_visible: doc.web_panel_visible(),
            custom_css: doc.custom_css().to_string(),
            sleep_mode_enabled: doc.sleep_mode_enabled(),
            sleep_mode_interval: doc.sleep_mode_interval(),
            favorite_sites: doc.favorite_sites(),
            adblock_enabled: self.shield.is_enabled(),
        }
    }

    /// Drain pending notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn ensure_writable(&self) -> NowbResult<()> {
        if self.is_private() {
            return Err(NowbError::settings(
                "Settings cannot be changed from a private window",
            ));
        }
        Ok(())
    }

    // Session

    pub fn plan_session(&self) -> Vec<TabPlan> {
        if self.is_private() {
            return vec![TabPlan::materialized(
                self.document.home_url(),
                PRIVATE_TAB_TITLE,
            )];
        }
        SessionReconciler::plan(&self.document)
    }

    /// Plan the session and build the tab strip from it. Only an empty
    /// strip can be restored into.
    pub fn restore_session(&mut self) -> NowbResult<Vec<TabId>> {
        if !self.tabs.is_empty() {
            return Err(NowbError::session(format!(
                "Session already restored ({} tabs open)",
                self.tabs.len()
            )));
        }
        let plan = self.plan_session();
        Ok(self.tabs.restore(plan, &mut self.views))
    }

    /// Fold live window state into the document
    pub fn capture_session(&mut self, live: &LiveState) -> SessionUpdate {
        let update = SessionReconciler::capture(live, self.document.restore_last_session());
        if !self.is_private() {
            update.apply_to(&mut self.document);
        }
        update
    }

    /// Live state as far as this process knows it
    pub fn live_state(&self) -> LiveState {
        LiveState {
            tab_urls: self.tabs.urls(),
            geometry: None,
            search_engine_url: Some(self.document.current_search_engine_url()),
            splitter_sizes: None,
        }
    }

    // Tabs

    pub fn materialize_tab(&mut self, id: TabId) -> NowbResult<bool> {
        self.tabs.materialize(id, &mut self.views)
    }

    pub fn activate_tab(&mut self, index: usize) -> NowbResult<bool> {
        self.tabs.activate(index, &mut self.views)
    }

    pub fn open_tab(&mut self, url: Option<&str>) -> NowbResult<TabId> {
        let url = url
            .map(str::to_string)
            .unwrap_or_else(|| self.document.home_url().to_string());

        if self.focus_mode && self.document.is_blocked_site(&url) {
            return Err(NowbError::tab(format!("{} is blocked in focus mode", url)));
        }

        let title = if self.is_private() {
            PRIVATE_TAB_TITLE.to_string()
        } else {
            url.clone()
        };
        self.tabs.open(&url, &title, &mut self.views)
    }

    pub fn close_tab(&mut self, index: usize) -> NowbResult<TabId> {
        self.tabs.close(index).map(|tab| tab.id)
    }

    pub fn tab_summaries(&self) -> Vec<TabSummary> {
        self.tabs.summaries()
    }

    // Document

    pub fn get_document(&self) -> NowbResult<RawDocument> {
        self.document.to_raw()
    }

    pub fn update_document(&mut self, partial: RawDocument) -> NowbResult<()> {
        self.ensure_writable()?;
        self.document.merge_partial(partial)?;
        self.shield.set_enabled(self.document.adblock_enabled());
        Ok(())
    }

    pub fn set_search_engine(&mut self, name: &str) -> NowbResult<String> {
        self.ensure_writable()?;
        Ok(self.document.select_search_engine(name))
    }

    /// Apply the answers from the first-run dialog and mark it done
    pub fn complete_first_run(
        &mut self,
        home_url: Option<&str>,
        search_engine: Option<&str>,
    ) -> NowbResult<()> {
        self.ensure_writable()?;
        if let Some(url) = home_url.map(str::trim).filter(|url| !url.is_empty()) {
            self.document.set_home_url(url);
        }
        if let Some(name) = search_engine {
            self.document.select_search_engine(name);
        }
        self.document.set_first_run_completed(true);
        tracing::info!("First run completed");
        Ok(())
    }

    pub fn add_favorite(&mut self, name: &str, url: &str) -> NowbResult<()> {
        self.ensure_writable()?;
        if name.trim().is_empty() || url.trim().is_empty() {
            return Err(NowbError::settings("Favorite needs a name and a URL"));
        }
        self.document.add_favorite(name.trim(), url.trim());
        Ok(())
    }

    pub fn remove_favorite(&mut self, name: &str) -> NowbResult<bool> {
        self.ensure_writable()?;
        Ok(self.document.remove_favorite(name))
    }

    pub fn resolve_input(&self, text: &str) -> Option<Resolution> {
        let blocked = self.document.blocked_sites();
        let blocked = self.focus_mode.then_some(blocked.as_slice());
        nowb_shell::resolve(text, &self.document.current_search_engine_url(), blocked)
    }

    pub fn set_focus_mode(&mut self, enabled: bool) {
        self.focus_mode = enabled;
        tracing::info!("Focus mode {}", if enabled { "on" } else { "off" });
    }

    // History

    /// Record a visit; returns whether an entry was added
    pub fn record_visit(&mut self, title: &str, url: &str) -> bool {
        let now = chrono::Local::now().naive_local();
        self.history.record(title, url, now)
    }

    pub fn history(&self, order: HistoryOrder, limit: Option<usize>) -> Vec<HistoryEntry> {
        let entries = self.history.list(order);
        match limit {
            Some(limit) => entries.into_iter().take(limit).collect(),
            None => entries,
        }
    }

    pub fn search_history(&self, query: &str, limit: usize) -> Vec<HistoryEntry> {
        self.history.search(query, limit)
    }

    /// Empties the log and the history file
    pub fn clear_history(&mut self) -> NowbResult<()> {
        self.history.clear();
        self.history_store.save(&self.history)
    }

    // Tab groups

    /// Group the given URLs, or every live tab when none are given.
    /// Placeholders have never been loaded and are left out.
    pub fn create_tab_group(
        &mut self,
        name: &str,
        urls: Option<Vec<String>>,
    ) -> NowbResult<TabGroupId> {
        let urls = urls.unwrap_or_else(|| self.tabs.live_urls());
        self.groups.create(name, urls)
    }

    pub fn remove_tab_group(&mut self, id: TabGroupId) -> NowbResult<TabGroup> {
        self.groups
            .remove(id)
            .ok_or_else(|| NowbError::not_found(id.to_string()))
    }

    /// Append the group's tabs to the strip
    pub fn open_tab_group(&mut self, id: TabGroupId) -> NowbResult<Vec<TabId>> {
        let plan = self.groups.open(id)?;
        Ok(self.tabs.restore(plan, &mut self.views))
    }

    // Shield

    pub fn check_url(&self, url: &str) -> bool {
        self.shield.should_block(url)
    }

    pub fn set_adblock_enabled(&mut self, enabled: bool) {
        self.shield.set_enabled(enabled);
        if !self.is_private() {
            self.document.set_adblock_enabled(enabled);
        }
    }

    pub fn shield_stats(&self) -> BlockingStats {
        self.shield.get_stats()
    }

    /// Add a rule and write the rule file. Returns false for a blank or
    /// duplicate rule.
    pub fn add_adblock_rule(&mut self, rule: &str) -> NowbResult<bool> {
        self.ensure_writable()?;
        if !self.shield.add_rule(rule) {
            return Ok(false);
        }
        save_rules(&self.config.adblock_rules_path(), self.shield.rules())?;
        Ok(true)
    }

    pub fn remove_adblock_rule(&mut self, rule: &str) -> NowbResult<bool> {
        self.ensure_writable()?;
        if !self.shield.remove_rule(rule) {
            return Ok(false);
        }
        save_rules(&self.config.adblock_rules_path(), self.shield.rules())?;
        Ok(true)
    }

    /// Re-read the rule file. Returns the number of rules now active.
    pub fn reload_adblock_rules(&mut self) -> usize {
        let list = load_rules(&self.config.adblock_rules_path());
        if let Some(warning) = &list.warning {
            self.notices.push(Notice::warning(warning.clone()));
        }
        self.shield.load_rules(list.rules);
        self.shield.rules().len()
    }

    // Theme

    pub fn theme(&self) -> ThemeMode {
        self.theme.current()
    }

    pub fn theme_registry(&self) -> &SharedThemeRegistry {
        self.theme.registry()
    }

    /// Change the theme of every open window. Returns how many were told.
    pub fn set_theme(&mut self, theme: ThemeMode) -> usize {
        self.theme.set(theme)
    }

    // Persistence

    /// Persist settings and history. Failures are also queued as notices.
    pub fn save(&mut self) -> NowbResult<()> {
        if self.is_private() {
            tracing::debug!("Private window, skipping save");
            return Ok(());
        }

        if let Err(e) = self.store.save(&self.document) {
            self.notices
                .push(Notice::error(format!("Failed to save settings: {}", e)));
            return Err(e);
        }
        if let Err(e) = self.history_store.save(&self.history) {
            self.notices
                .push(Notice::error(format!("Failed to save history: {}", e)));
            return Err(e);
        }

        tracing::info!("Saved settings and {} history entries", self.history.len());
        Ok(())
    }

    /// Capture the live state and save, as done when the window closes
    pub fn shutdown(&mut self, live: &LiveState) -> NowbResult<()> {
        self.capture_session(live);
        self.save()
    }
}
