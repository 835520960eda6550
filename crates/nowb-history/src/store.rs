//! History file persistence
//!
//! The file is a JSON array in chronological order. Entries are read one at
//! a time: `[title, url]` pairs written by older builds and objects without a
//! usable timestamp are stamped with the load time, and only entries with no
//! URL are dropped. Whenever something on disk could not be kept, the file is
//! copied aside before the next save can overwrite it.

use crate::{HistoryEntry, HistoryLog};
use chrono::NaiveDateTime;
use nowb_core::backup::backup_file;
use nowb_core::{AppConfig, NowbError, NowbResult, ProfileMode};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Entries read from disk plus a warning when part of the file was unusable
#[derive(Debug, Clone, Default)]
pub struct HistoryLoad {
    pub entries: Vec<HistoryEntry>,
    pub warning: Option<String>,
    /// Copy of the file taken because entries were dropped
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    mode: ProfileMode,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, mode: ProfileMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.history_path(), config.mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> HistoryLoad {
        self.load_at(chrono::Local::now().naive_local())
    }

    /// Load using `now` as the timestamp for entries that carry none
    pub fn load_at(&self, now: NaiveDateTime) -> HistoryLoad {
        if self.mode.is_private() {
            return HistoryLoad::default();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HistoryLoad::default(),
            Err(e) => return self.unusable(Vec::new(), format!("read failed: {}", e), now),
        };

        let stored: Vec<Value> = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                return self.unusable(Vec::new(), format!("invalid history data: {}", e), now)
            }
        };

        let total = stored.len();
        let mut entries = Vec::with_capacity(total);
        for (index, value) in stored.into_iter().enumerate() {
            match entry_from_value(value, now) {
                Some(entry) => entries.push(entry),
                None => {
                    log::warn!("Skipping unreadable history entry #{} in {:?}", index, self.path)
                }
            }
        }

        let skipped = total - entries.len();
        if skipped > 0 {
            return self.unusable(
                entries,
                format!("{} of {} entries were unreadable", skipped, total),
                now,
            );
        }

        log::debug!("Loaded {} history entries from {:?}", entries.len(), self.path);
        HistoryLoad {
            entries,
            warning: None,
            backup: None,
        }
    }

    /// Keep what could be read and copy the file aside
    fn unusable(
        &self,
        entries: Vec<HistoryEntry>,
        reason: String,
        now: NaiveDateTime,
    ) -> HistoryLoad {
        log::warn!("History file {:?} partly ignored: {}", self.path, reason);

        let (backup, warning) = match backup_file(&self.path, now) {
            Ok(Some(backup)) => {
                log::info!("History backed up to {:?}", backup);
                let warning = format!(
                    "History could not be fully loaded ({}); the original was saved as {}",
                    reason,
                    backup.display()
                );
                (Some(backup), warning)
            }
            Ok(None) => (None, format!("History could not be loaded ({})", reason)),
            Err(e) => {
                log::warn!("Failed to back up history {:?}: {}", self.path, e);
                (
                    None,
                    format!(
                        "History could not be loaded ({}) and the file could not be backed up: {}",
                        reason, e
                    ),
                )
            }
        };

        HistoryLoad {
            entries,
            warning: Some(warning),
            backup,
        }
    }

    /// Load straight into a log with the given capacity
    pub fn load_log(&self, capacity: usize) -> (HistoryLog, Option<String>) {
        if self.mode.is_private() {
            return (HistoryLog::private(), None);
        }
        let HistoryLoad {
            entries, warning, ..
        } = self.load();
        (HistoryLog::with_entries(entries, capacity), warning)
    }

    pub fn save(&self, log: &HistoryLog) -> NowbResult<()> {
        if self.mode.is_private() || log.is_private() {
            return Ok(());
        }

        let entries: Vec<&HistoryEntry> = log.iter().collect();
        let data = serde_json::to_string_pretty(&entries).map_err(|err| {
            NowbError::history(format!("Failed to serialize history: {}", err))
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// One stored entry, in either the current object shape or the legacy pair
fn entry_from_value(value: Value, now: NaiveDateTime) -> Option<HistoryEntry> {
    let (title, url, timestamp) = match value {
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(title), Value::String(url)] => (title.clone(), url.clone(), None),
            _ => return None,
        },
        Value::Object(mut fields) => {
            let url = match fields.remove("url") {
                Some(Value::String(url)) => url,
                _ => return None,
            };
            let title = match fields.remove("title") {
                Some(Value::String(title)) => title,
                _ => String::new(),
            };
            let timestamp = fields
                .remove("timestamp")
                .and_then(|ts| serde_json::from_value::<NaiveDateTime>(ts).ok());
            (title, url, timestamp)
        }
        _ => return None,
    };

    if url.is_empty() {
        return None;
    }
    Some(HistoryEntry {
        title: if title.is_empty() { url.clone() } else { title },
        url,
        timestamp: timestamp.unwrap_or(now),
    })
}
