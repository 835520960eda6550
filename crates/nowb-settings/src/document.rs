//! Typed settings schema
//!
//! Every recognized key is a named optional field; keys this build does not
//! know about are carried untouched in `extra` so that older and newer
//! builds can share one file. Callers read through accessors, which fall
//! back to the values in [`defaults`] when a key is absent.

use crate::version::SchemaVersion;
use nowb_core::types::WindowGeometry;
use nowb_core::{NowbError, NowbResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The settings file as read from disk, before typing
pub type RawDocument = Map<String, Value>;

/// Key names as they appear in the settings file
pub mod keys {
    pub const SETTINGS_VERSION: &str = "settings_version";
    pub const APP_VERSION: &str = "app_version";
    pub const FIRST_RUN_COMPLETED: &str = "first_run_completed";
    pub const HOME_URL: &str = "home_url";
    pub const SEARCH_ENGINES: &str = "search_engines";
    pub const CURRENT_SEARCH_ENGINE_URL: &str = "current_search_engine_url";
    pub const SEARCH_ENGINE_NAME: &str = "search_engine_name";
    pub const BLOCKED_SITES: &str = "blocked_sites";
    pub const FAVORITE_SITES: &str = "favorite_sites";
    pub const CUSTOM_CSS: &str = "custom_css";
    pub const WINDOW_SIZE: &str = "window_size";
    pub const WINDOW_POS: &str = "window_pos";
    pub const WEB_PANEL_URL: &str = "web_panel_url";
    pub const WEB_PANEL_VISIBLE: &str = "web_panel_visible";
    pub const SPLITTER_SIZES: &str = "splitter_sizes";
    pub const ADBLOCK_ENABLED: &str = "adblock_enabled";
    pub const RESTORE_LAST_SESSION: &str = "restore_last_session";
    pub const LAST_SESSION: &str = "last_session";
    pub const SLEEP_MODE_ENABLED: &str = "sleep_mode_enabled";
    pub const SLEEP_MODE_INTERVAL: &str = "sleep_mode_interval";

    /// Pre-1.1 name of `current_search_engine_url`
    pub const LEGACY_SEARCH_ENGINE_URL: &str = "search_engine_url";

    pub const RECOGNIZED: &[&str] = &[
        SETTINGS_VERSION,
        APP_VERSION,
        FIRST_RUN_COMPLETED,
        HOME_URL,
        SEARCH_ENGINES,
        CURRENT_SEARCH_ENGINE_URL,
        SEARCH_ENGINE_NAME,
        BLOCKED_SITES,
        FAVORITE_SITES,
        CUSTOM_CSS,
        WINDOW_SIZE,
        WINDOW_POS,
        WEB_PANEL_URL,
        WEB_PANEL_VISIBLE,
        SPLITTER_SIZES,
        ADBLOCK_ENABLED,
        RESTORE_LAST_SESSION,
        LAST_SESSION,
        SLEEP_MODE_ENABLED,
        SLEEP_MODE_INTERVAL,
    ];

    pub fn is_recognized(key: &str) -> bool {
        RECOGNIZED.contains(&key)
    }
}

/// Fallback values for absent keys
pub mod defaults {
    use std::collections::BTreeMap;

    pub const HOME_URL: &str = "https://start.popmix-os.net";
    pub const SEARCH_ENGINE_NAME: &str = "Google";
    pub const SEARCH_ENGINE_URL: &str = "https://www.google.com/search?q=";
    pub const WEB_PANEL_URL: &str = "https://www.bing.com/chat";
    pub const WEB_PANEL_VISIBLE: bool = false;
    pub const WINDOW_SIZE: [u32; 2] = [1024, 768];
    pub const WINDOW_POS: [i32; 2] = [100, 100];
    pub const SPLITTER_SIZES: [u32; 2] = [800, 250];
    pub const ADBLOCK_ENABLED: bool = true;
    pub const RESTORE_LAST_SESSION: bool = true;
    pub const SLEEP_MODE_ENABLED: bool = true;
    /// Five minutes
    pub const SLEEP_MODE_INTERVAL_MS: u64 = 300_000;

    pub fn search_engines() -> BTreeMap<String, String> {
        [
            ("Google", SEARCH_ENGINE_URL),
            ("Bing", "https://www.bing.com/search?q="),
            ("DuckDuckGo", "https://duckduckgo.com/?q="),
        ]
        .into_iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect()
    }

    pub fn blocked_sites() -> Vec<String> {
        ["twitter.com", "facebook.com", "tiktok.com"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn favorite_sites() -> BTreeMap<String, String> {
        [
            ("Popmix-OS Start", HOME_URL),
            ("GitHub", "https://github.com"),
            ("YouTube", "http://youtube.com"),
            ("Wikipedia", "https://www.wikipedia.org"),
        ]
        .into_iter()
        .map(|(name, url)| (name.to_string(), url.to_string()))
        .collect()
    }
}

/// Typed view of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    settings_version: Option<SchemaVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_run_completed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    home_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search_engines: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_search_engine_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    search_engine_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    blocked_sites: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    favorite_sites: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_css: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_size: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_pos: Option<[i32; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    web_panel_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    web_panel_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    splitter_sizes: Option<Vec<u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    adblock_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    restore_last_session: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_session: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    sleep_mode_enabled: Option<bool>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sleep_mode_interval: Option<u64>,

    /// Unknown keys, and recognized keys whose value has the wrong shape
    #[serde(flatten)]
    extra: RawDocument,
}

impl SettingsDocument {
    /// Type a raw document without losing anything.
    ///
    /// A recognized key whose value does not fit the schema is kept verbatim
    /// in `extra`; its accessor then reports the default.
    pub fn from_raw(raw: RawDocument) -> Self {
        match serde_json::from_value::<Self>(Value::Object(raw.clone())) {
            Ok(doc) => doc,
            Err(err) => {
                log::warn!("Settings document has malformed values: {}", err);
                let mut typed = RawDocument::new();
                let mut untyped = RawDocument::new();
                for (key, value) in raw {
                    if Self::check_value(&key, &value).is_ok() {
                        typed.insert(key, value);
                    } else {
                        log::warn!("Keeping malformed setting '{}' untyped", key);
                        untyped.insert(key, value);
                    }
                }
                let mut doc =
                    serde_json::from_value::<Self>(Value::Object(typed)).unwrap_or_default();
                doc.extra.extend(untyped);
                doc
            }
        }
    }

    /// Serialize back to a flat JSON object
    pub fn to_raw(&self) -> NowbResult<RawDocument> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(NowbError::settings(format!(
                "Settings serialized to a non-object: {}",
                other
            ))),
        }
    }

    /// Check a single key/value pair against the schema
    fn check_value(key: &str, value: &Value) -> Result<(), serde_json::Error> {
        let mut single = RawDocument::new();
        single.insert(key.to_string(), value.clone());
        serde_json::from_value::<Self>(Value::Object(single)).map(|_| ())
    }

    /// Merge a partial update coming from the settings UI.
    ///
    /// `null` removes a key. The version tag belongs to the migration engine
    /// and cannot be changed here.
    pub fn merge_partial(&mut self, partial: RawDocument) -> NowbResult<()> {
        if partial.contains_key(keys::SETTINGS_VERSION) {
            return Err(NowbError::settings(
                "settings_version can only be changed by migration",
            ));
        }

        for (key, value) in &partial {
            if keys::is_recognized(key) && !value.is_null() {
                Self::check_value(key, value).map_err(|e| {
                    NowbError::settings(format!("Invalid value for '{}': {}", key, e))
                })?;
            }
        }

        let mut raw = self.to_raw()?;
        for (key, value) in partial {
            if value.is_null() {
                raw.remove(&key);
            } else {
                raw.insert(key, value);
            }
        }
        *self = Self::from_raw(raw);
        Ok(())
    }

    /// True when the file had no content at all
    pub fn is_empty(&self) -> bool {
        self.to_raw().map(|raw| raw.is_empty()).unwrap_or(true)
    }

    /// Keys this build does not understand
    pub fn extra(&self) -> &RawDocument {
        &self.extra
    }

    // Version tags

    /// Tag as stored; `None` means the oldest known version
    pub fn settings_version(&self) -> Option<SchemaVersion> {
        self.settings_version
    }

    pub fn set_settings_version(&mut self, version: SchemaVersion) {
        self.extra.remove(keys::SETTINGS_VERSION);
        self.settings_version = Some(version);
    }

    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    pub fn set_app_version(&mut self, version: impl Into<String>) {
        self.extra.remove(keys::APP_VERSION);
        self.app_version = Some(version.into());
    }

    pub fn first_run_completed(&self) -> bool {
        self.first_run_completed.unwrap_or(false)
    }

    pub fn set_first_run_completed(&mut self, completed: bool) {
        self.extra.remove(keys::FIRST_RUN_COMPLETED);
        self.first_run_completed = Some(completed);
    }

    // Navigation

    pub fn home_url(&self) -> &str {
        self.home_url.as_deref().unwrap_or(defaults::HOME_URL)
    }

    pub fn set_home_url(&mut self, url: impl Into<String>) {
        self.extra.remove(keys::HOME_URL);
        self.home_url = Some(url.into());
    }

    pub fn search_engines(&self) -> BTreeMap<String, String> {
        self.search_engines
            .clone()
            .unwrap_or_else(defaults::search_engines)
    }

    /// Query-template URL of the selected engine
    pub fn current_search_engine_url(&self) -> String {
        if let Some(url) = &self.current_search_engine_url {
            return url.clone();
        }
        self.search_engines()
            .get(defaults::SEARCH_ENGINE_NAME)
            .cloned()
            .unwrap_or_else(|| defaults::SEARCH_ENGINE_URL.to_string())
    }

    pub fn set_current_search_engine_url(&mut self, url: impl Into<String>) {
        self.extra.remove(keys::CURRENT_SEARCH_ENGINE_URL);
        self.current_search_engine_url = Some(url.into());
    }

    /// Name of the engine whose template matches the selection
    pub fn search_engine_name(&self) -> String {
        let current = self.current_search_engine_url();
        self.search_engines()
            .into_iter()
            .find(|(_, url)| *url == current)
            .map(|(name, _)| name)
            .unwrap_or_else(|| defaults::SEARCH_ENGINE_NAME.to_string())
    }

    /// Select an engine by name. Unknown names fall back to Google.
    pub fn select_search_engine(&mut self, name: &str) -> String {
        let engines = self.search_engines();
        let url = engines
            .get(name)
            .or_else(|| engines.get(defaults::SEARCH_ENGINE_NAME))
            .cloned()
            .unwrap_or_else(|| defaults::SEARCH_ENGINE_URL.to_string());
        self.set_current_search_engine_url(url.clone());
        url
    }

    pub fn blocked_sites(&self) -> Vec<String> {
        self.blocked_sites
            .clone()
            .unwrap_or_else(defaults::blocked_sites)
    }

    // Favorites

    pub fn favorite_sites(&self) -> BTreeMap<String, String> {
        self.favorite_sites
            .clone()
            .unwrap_or_else(defaults::favorite_sites)
    }

    /// Add or replace a favorite
    pub fn add_favorite(&mut self, name: impl Into<String>, url: impl Into<String>) {
        let mut favorites = self.favorite_sites();
        favorites.insert(name.into(), url.into());
        self.extra.remove(keys::FAVORITE_SITES);
        self.favorite_sites = Some(favorites);
    }

    pub fn remove_favorite(&mut self, name: &str) -> bool {
        let mut favorites = self.favorite_sites();
        let removed = favorites.remove(name).is_some();
        if removed {
            self.extra.remove(keys::FAVORITE_SITES);
            self.favorite_sites = Some(favorites);
        }
        removed
    }

    // Appearance

    pub fn custom_css(&self) -> &str {
        self.custom_css.as_deref().unwrap_or("")
    }

    // Window

    pub fn window_size(&self) -> [u32; 2] {
        self.window_size.unwrap_or(defaults::WINDOW_SIZE)
    }

    pub fn window_pos(&self) -> [i32; 2] {
        self.window_pos.unwrap_or(defaults::WINDOW_POS)
    }

    pub fn set_window_geometry(&mut self, geometry: &WindowGeometry) {
        self.extra.remove(keys::WINDOW_SIZE);
        self.extra.remove(keys::WINDOW_POS);
        self.window_size = Some([geometry.width, geometry.height]);
        self.window_pos = Some([geometry.x, geometry.y]);
    }

    pub fn web_panel_url(&self) -> &str {
        self.web_panel_url
            .as_deref()
            .unwrap_or(defaults::WEB_PANEL_URL)
    }

    pub fn web_panel_visible(&self) -> bool {
        self.web_panel_visible
            .unwrap_or(defaults::WEB_PANEL_VISIBLE)
    }

    pub fn splitter_sizes(&self) -> Vec<u32> {
        self.splitter_sizes
            .clone()
            .unwrap_or_else(|| defaults::SPLITTER_SIZES.to_vec())
    }

    pub fn set_splitter_sizes(&mut self, sizes: Vec<u32>) {
        self.extra.remove(keys::SPLITTER_SIZES);
        self.splitter_sizes = Some(sizes);
    }

    // Features

    pub fn adblock_enabled(&self) -> bool {
        self.adblock_enabled.unwrap_or(defaults::ADBLOCK_ENABLED)
    }

    pub fn set_adblock_enabled(&mut self, enabled: bool) {
        self.extra.remove(keys::ADBLOCK_ENABLED);
        self.adblock_enabled = Some(enabled);
    }

    pub fn restore_last_session(&self) -> bool {
        self.restore_last_session
            .unwrap_or(defaults::RESTORE_LAST_SESSION)
    }

    pub fn set_restore_last_session(&mut self, enabled: bool) {
        self.extra.remove(keys::RESTORE_LAST_SESSION);
        self.restore_last_session = Some(enabled);
    }

    pub fn last_session(&self) -> &[String] {
        self.last_session.as_deref().unwrap_or(&[])
    }

    pub fn set_last_session(&mut self, urls: Vec<String>) {
        self.extra.remove(keys::LAST_SESSION);
        self.last_session = Some(urls);
    }

    pub fn sleep_mode_enabled(&self) -> bool {
        self.sleep_mode_enabled
            .unwrap_or(defaults::SLEEP_MODE_ENABLED)
    }

    /// Idle interval in milliseconds
    pub fn sleep_mode_interval(&self) -> u64 {
        self.sleep_mode_interval
            .unwrap_or(defaults::SLEEP_MODE_INTERVAL_MS)
    }

    /// Whether `url` matches one of the focus-mode blocked substrings
    pub fn is_blocked_site(&self, url: &str) -> bool {
        self.blocked_sites()
            .iter()
            .any(|site| !site.is_empty() && url.contains(site.as_str()))
    }
}
