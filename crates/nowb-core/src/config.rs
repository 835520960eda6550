//! Application configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application version stamped into the settings document on save
pub const APP_VERSION: &str = concat!("V", env!("CARGO_PKG_VERSION"));

/// Default file names inside the data directory
pub const SETTINGS_FILE_NAME: &str = "project_nowb_settings.json";
pub const HISTORY_FILE_NAME: &str = "project_nowb_history.json";
pub const ADBLOCK_RULES_FILE_NAME: &str = "adblock_list.txt";

/// Maximum number of retained history entries
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Whether a window may touch persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    /// Normal window: owns and persists the settings document and history
    #[default]
    Persistent,
    /// Private window: read-only snapshot, never writes to disk
    Private,
}

impl ProfileMode {
    pub fn is_private(self) -> bool {
        matches!(self, ProfileMode::Private)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data directory for persistent storage
    pub data_dir: PathBuf,

    /// Settings document file name (relative to `data_dir`)
    pub settings_file: String,

    /// History file name (relative to `data_dir`)
    pub history_file: String,

    /// Ad-block rule list file name (relative to `data_dir`)
    pub adblock_rules_file: String,

    /// Maximum number of history entries kept
    pub history_capacity: usize,

    /// Persistent or private profile
    pub mode: ProfileMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_data_dir(dirs_or_default())
    }
}

impl AppConfig {
    /// Configuration rooted at an explicit data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            settings_file: SETTINGS_FILE_NAME.to_string(),
            history_file: HISTORY_FILE_NAME.to_string(),
            adblock_rules_file: ADBLOCK_RULES_FILE_NAME.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            mode: ProfileMode::Persistent,
        }
    }

    /// Same configuration, switched to a private profile
    pub fn private(mut self) -> Self {
        self.mode = ProfileMode::Private;
        self
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(&self.settings_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    pub fn adblock_rules_path(&self) -> PathBuf {
        self.data_dir.join(&self.adblock_rules_file)
    }

    /// Create the data directory if it doesn't exist (persistent profiles only)
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        if self.mode.is_private() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Get data directory, with fallback
fn dirs_or_default() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("nowb");
    }

    log::warn!("No local data directory available, using ./.nowb");
    PathBuf::from(".nowb")
}
