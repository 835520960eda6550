//! Settings file persistence

use crate::document::{RawDocument, SettingsDocument};
use crate::migration::{MigrationEngine, MigrationReport, MigrationStatus};
use crate::version::CURRENT_SCHEMA_VERSION;
use nowb_core::config::APP_VERSION;
use nowb_core::{AppConfig, NowbError, NowbResult, ProfileMode};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Non-blocking problem found while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWarning {
    /// File exists but is not a JSON object
    Corrupt { path: PathBuf, error: String },
    /// File exists but could not be read
    Unreadable { path: PathBuf, error: String },
}

impl fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreWarning::Corrupt { path, error } => {
                write!(f, "Settings file {} is corrupt ({}); starting fresh", path.display(), error)
            }
            StoreWarning::Unreadable { path, error } => {
                write!(f, "Could not read settings file {}: {}", path.display(), error)
            }
        }
    }
}

/// Raw document plus anything worth telling the user about
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub document: RawDocument,
    pub warnings: Vec<StoreWarning>,
}

/// Fully loaded, migrated and typed settings
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub document: SettingsDocument,
    pub status: MigrationStatus,
    pub migration: Option<MigrationReport>,
    pub warnings: Vec<StoreWarning>,
}

/// Reads and writes the settings document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    mode: ProfileMode,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, mode: ProfileMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.settings_path(), config.mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_private(&self) -> bool {
        self.mode.is_private()
    }

    /// Load the raw document. Never fails; problems degrade to empty.
    pub fn load(&self) -> RawDocument {
        self.load_outcome().document
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        if self.is_private() {
            return LoadOutcome::default();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings file at {:?}, starting empty", self.path);
                return LoadOutcome::default();
            }
            Err(e) => {
                log::warn!("Failed to read settings {:?}: {}", self.path, e);
                return LoadOutcome {
                    document: RawDocument::new(),
                    warnings: vec![StoreWarning::Unreadable {
                        path: self.path.clone(),
                        error: e.to_string(),
                    }],
                };
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(document)) => LoadOutcome {
                document,
                warnings: Vec::new(),
            },
            Ok(other) => self.corrupt(format!("expected a JSON object, found {}", kind(&other))),
            Err(e) => self.corrupt(e.to_string()),
        }
    }

    fn corrupt(&self, error: String) -> LoadOutcome {
        log::warn!("Settings file {:?} is corrupt: {}", self.path, error);
        LoadOutcome {
            document: RawDocument::new(),
            warnings: vec![StoreWarning::Corrupt {
                path: self.path.clone(),
                error,
            }],
        }
    }

    /// Load, migrate and type the document in one go
    pub fn load_migrated(&self, engine: &MigrationEngine) -> LoadedSettings {
        let LoadOutcome { document, warnings } = self.load_outcome();
        let source = if self.is_private() {
            None
        } else {
            Some(self.path.as_path())
        };
        let outcome = engine.migrate(document, source);

        LoadedSettings {
            document: SettingsDocument::from_raw(outcome.document),
            status: outcome.status,
            migration: outcome.report,
            warnings,
        }
    }

    /// Write the document, stamping both version tags.
    ///
    /// A tag newer than this build is kept as is. Private stores never write.
    pub fn save(&self, document: &SettingsDocument) -> NowbResult<()> {
        if self.is_private() {
            log::debug!("Private profile, not saving settings");
            return Ok(());
        }

        let mut document = document.clone();
        match document.settings_version() {
            Some(version) if version > CURRENT_SCHEMA_VERSION => {}
            _ => document.set_settings_version(CURRENT_SCHEMA_VERSION),
        }
        document.set_app_version(APP_VERSION);

        let content = serde_json::to_string_pretty(&document.to_raw()?)?;

        self.write(&content).map_err(|e| {
            log::error!("Failed to save settings to {:?}: {}", self.path, e);
            e
        })?;

        log::debug!("Settings saved to {:?}", self.path);
        Ok(())
    }

    fn write(&self, content: &str) -> NowbResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, content)
            .map_err(|e| NowbError::settings(format!("write {}: {}", self.path.display(), e)))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
