//! Forward migration of the settings document
//!
//! The engine inspects the `settings_version` tag, copies the file aside,
//! runs every registered step between the document's version and
//! [`CURRENT_SCHEMA_VERSION`], then stamps the new tag. Steps only rename a
//! legacy key when its replacement is absent and only fill absent keys, so a
//! second run is a no-op.

use crate::document::{defaults, keys, RawDocument};
use crate::version::{SchemaVersion, CURRENT_SCHEMA_VERSION};
use chrono::NaiveDateTime;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub use nowb_core::backup::backup_file;

/// Where a document stands relative to this build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    UpToDate,
    NeedsMigration { from: SchemaVersion },
    /// Written by a newer build; left alone
    Newer(SchemaVersion),
}

/// A single version-specific transformation
#[derive(Clone)]
pub struct MigrationStep {
    pub target: SchemaVersion,
    pub description: &'static str,
    pub apply: fn(&mut RawDocument),
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("target", &self.target)
            .field("description", &self.description)
            .finish()
    }
}

/// What a migration run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    pub applied: Vec<SchemaVersion>,
    /// True when the document was empty and first-run values were written
    pub seeded_defaults: bool,
    pub backup: Option<PathBuf>,
    pub backup_error: Option<String>,
}

impl MigrationReport {
    /// One-line description suitable for a notification
    pub fn summary(&self) -> String {
        let mut text = if self.seeded_defaults {
            format!("Created new settings (version {})", self.to)
        } else {
            format!("Settings migrated from {} to {}", self.from, self.to)
        };
        if let Some(path) = &self.backup {
            text.push_str(&format!("; backup saved to {}", path.display()));
        }
        if let Some(err) = &self.backup_error {
            text.push_str(&format!("; backup failed: {}", err));
        }
        text
    }
}

/// Result of [`MigrationEngine::migrate`]
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub document: RawDocument,
    pub status: MigrationStatus,
    /// Present only when the document was actually migrated
    pub report: Option<MigrationReport>,
}

impl MigrationOutcome {
    pub fn migrated(&self) -> bool {
        self.report.is_some()
    }
}

pub struct MigrationEngine {
    current: SchemaVersion,
    steps: Vec<MigrationStep>,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationEngine {
    /// Engine with every built-in step registered
    pub fn new() -> Self {
        let mut engine = Self {
            current: CURRENT_SCHEMA_VERSION,
            steps: Vec::new(),
        };
        engine.register(MigrationStep {
            target: SchemaVersion::new(1, 1),
            description: "rename search_engine_url, add session and sleep mode keys",
            apply: migrate_to_1_1,
        });
        engine
    }

    /// Register a step. Steps run in ascending target order.
    pub fn register(&mut self, step: MigrationStep) {
        self.steps.push(step);
        self.steps.sort_by_key(|s| s.target);
    }

    pub fn current(&self) -> SchemaVersion {
        self.current
    }

    /// Version recorded in the document; absent or unreadable means oldest
    pub fn document_version(raw: &RawDocument) -> SchemaVersion {
        match raw.get(keys::SETTINGS_VERSION) {
            None | Some(Value::Null) => SchemaVersion::OLDEST,
            Some(Value::String(tag)) => SchemaVersion::parse(tag).unwrap_or_else(|| {
                log::warn!("Unreadable settings version {:?}, treating as oldest", tag);
                SchemaVersion::OLDEST
            }),
            Some(Value::Number(n)) => {
                SchemaVersion::parse(&n.to_string()).unwrap_or(SchemaVersion::OLDEST)
            }
            Some(other) => {
                log::warn!("Unexpected settings version {}, treating as oldest", other);
                SchemaVersion::OLDEST
            }
        }
    }

    pub fn status(&self, raw: &RawDocument) -> MigrationStatus {
        let version = Self::document_version(raw);
        if !raw.contains_key(keys::SETTINGS_VERSION) || version < self.current {
            MigrationStatus::NeedsMigration { from: version }
        } else if version > self.current {
            MigrationStatus::Newer(version)
        } else {
            MigrationStatus::UpToDate
        }
    }

    /// Migrate `raw`, backing up `source` first when it exists
    pub fn migrate(&self, raw: RawDocument, source: Option<&Path>) -> MigrationOutcome {
        self.migrate_at(raw, source, chrono::Local::now().naive_local())
    }

    /// [`migrate`](Self::migrate) with an explicit clock for the backup name
    pub fn migrate_at(
        &self,
        mut raw: RawDocument,
        source: Option<&Path>,
        now: NaiveDateTime,
    ) -> MigrationOutcome {
        let from = match self.status(&raw) {
            MigrationStatus::UpToDate => {
                return MigrationOutcome {
                    document: raw,
                    status: MigrationStatus::UpToDate,
                    report: None,
                };
            }
            MigrationStatus::Newer(version) => {
                log::warn!(
                    "Settings version {} is newer than supported {}, leaving document untouched",
                    version,
                    self.current
                );
                return MigrationOutcome {
                    document: raw,
                    status: MigrationStatus::Newer(version),
                    report: None,
                };
            }
            MigrationStatus::NeedsMigration { from } => from,
        };

        log::info!("Migrating settings from {} to {}", from, self.current);

        // Backup before touching anything in memory
        let (backup, backup_error) = match source {
            Some(path) => match backup_file(path, now) {
                Ok(Some(backup)) => {
                    log::info!("Settings backed up to {:?}", backup);
                    (Some(backup), None)
                }
                Ok(None) => (None, None),
                Err(e) => {
                    log::warn!("Failed to back up settings {:?}: {}", path, e);
                    (None, Some(e.to_string()))
                }
            },
            None => (None, None),
        };

        let seeded_defaults = raw.is_empty();
        if seeded_defaults {
            seed_first_run(&mut raw);
        }

        let mut applied = Vec::new();
        for step in &self.steps {
            if step.target > from && step.target <= self.current {
                log::debug!("Applying settings step {}: {}", step.target, step.description);
                (step.apply)(&mut raw);
                applied.push(step.target);
            }
        }

        raw.insert(
            keys::SETTINGS_VERSION.to_string(),
            Value::String(self.current.to_string()),
        );

        MigrationOutcome {
            document: raw,
            status: MigrationStatus::NeedsMigration { from },
            report: Some(MigrationReport {
                from,
                to: self.current,
                applied,
                seeded_defaults,
                backup,
                backup_error,
            }),
        }
    }
}

fn set_if_absent(doc: &mut RawDocument, key: &str, value: Value) {
    if !doc.contains_key(key) {
        doc.insert(key.to_string(), value);
    }
}

fn rename_if_absent(doc: &mut RawDocument, legacy: &str, current: &str) {
    if doc.contains_key(current) {
        return;
    }
    if let Some(value) = doc.remove(legacy) {
        doc.insert(current.to_string(), value);
    }
}

fn migrate_to_1_1(doc: &mut RawDocument) {
    rename_if_absent(
        doc,
        keys::LEGACY_SEARCH_ENGINE_URL,
        keys::CURRENT_SEARCH_ENGINE_URL,
    );
    set_if_absent(doc, keys::SLEEP_MODE_ENABLED, json!(defaults::SLEEP_MODE_ENABLED));
    set_if_absent(
        doc,
        keys::SLEEP_MODE_INTERVAL,
        json!(defaults::SLEEP_MODE_INTERVAL_MS),
    );
    set_if_absent(
        doc,
        keys::RESTORE_LAST_SESSION,
        json!(defaults::RESTORE_LAST_SESSION),
    );
    set_if_absent(doc, keys::ADBLOCK_ENABLED, json!(defaults::ADBLOCK_ENABLED));
    set_if_absent(doc, keys::LAST_SESSION, json!([]));
    set_if_absent(doc, keys::WEB_PANEL_VISIBLE, json!(defaults::WEB_PANEL_VISIBLE));
    set_if_absent(doc, keys::SPLITTER_SIZES, json!(defaults::SPLITTER_SIZES));
}

/// Values a brand new profile starts with
fn seed_first_run(doc: &mut RawDocument) {
    set_if_absent(doc, keys::HOME_URL, json!(defaults::HOME_URL));
    set_if_absent(doc, keys::SEARCH_ENGINES, json!(defaults::search_engines()));
    set_if_absent(
        doc,
        keys::CURRENT_SEARCH_ENGINE_URL,
        json!(defaults::SEARCH_ENGINE_URL),
    );
    set_if_absent(doc, keys::SEARCH_ENGINE_NAME, json!(defaults::SEARCH_ENGINE_NAME));
    set_if_absent(doc, keys::BLOCKED_SITES, json!(defaults::blocked_sites()));
    set_if_absent(doc, keys::FAVORITE_SITES, json!(defaults::favorite_sites()));
    set_if_absent(doc, keys::CUSTOM_CSS, json!(""));
    set_if_absent(doc, keys::WINDOW_SIZE, json!(defaults::WINDOW_SIZE));
    set_if_absent(doc, keys::WINDOW_POS, json!(defaults::WINDOW_POS));
    set_if_absent(doc, keys::WEB_PANEL_URL, json!(defaults::WEB_PANEL_URL));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn raw(value: Value) -> RawDocument {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap()
    }

    #[test]
    fn test_status() {
        let engine = MigrationEngine::new();
        assert_eq!(
            engine.status(&raw(json!({ "home_url": "x" }))),
            MigrationStatus::NeedsMigration {
                from: SchemaVersion::OLDEST
            }
        );
        assert_eq!(
            engine.status(&raw(json!({ "settings_version": "1.0" }))),
            MigrationStatus::NeedsMigration {
                from: SchemaVersion::new(1, 0)
            }
        );
        assert_eq!(
            engine.status(&raw(json!({ "settings_version": "1.1" }))),
            MigrationStatus::UpToDate
        );
        assert_eq!(
            engine.status(&raw(json!({ "settings_version": "1.10" }))),
            MigrationStatus::Newer(SchemaVersion::new(1, 10))
        );
        assert_eq!(
            engine.status(&raw(json!({ "settings_version": "garbage" }))),
            MigrationStatus::NeedsMigration {
                from: SchemaVersion::OLDEST
            }
        );
    }

    #[test]
    fn test_migration_is_idempotent() {
        let engine = MigrationEngine::new();
        let input = raw(json!({
            "home_url": "https://example.com",
            "search_engine_url": "https://duckduckgo.com/?q=",
            "foo": "bar"
        }));

        let once = engine.migrate_at(input, None, fixed_now());
        assert!(once.migrated());

        let twice = engine.migrate_at(once.document.clone(), None, fixed_now());
        assert!(!twice.migrated());
        assert_eq!(twice.status, MigrationStatus::UpToDate);
        assert_eq!(twice.document, once.document);
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let engine = MigrationEngine::new();
        let out = engine.migrate_at(
            raw(json!({ "foo": "bar", "background_image": "bg.png" })),
            None,
            fixed_now(),
        );
        assert_eq!(out.document.get("foo"), Some(&json!("bar")));
        assert_eq!(out.document.get("background_image"), Some(&json!("bg.png")));
    }

    #[test]
    fn test_legacy_search_engine_renamed() {
        let engine = MigrationEngine::new();
        let out = engine.migrate_at(
            raw(json!({ "search_engine_url": "https://www.bing.com/search?q=" })),
            None,
            fixed_now(),
        );
        assert_eq!(
            out.document.get("current_search_engine_url"),
            Some(&json!("https://www.bing.com/search?q="))
        );
        assert!(!out.document.contains_key("search_engine_url"));
    }

    #[test]
    fn test_rename_does_not_clobber_current_key() {
        let engine = MigrationEngine::new();
        let out = engine.migrate_at(
            raw(json!({
                "search_engine_url": "https://old.example/?q=",
                "current_search_engine_url": "https://new.example/?q="
            })),
            None,
            fixed_now(),
        );
        assert_eq!(
            out.document.get("current_search_engine_url"),
            Some(&json!("https://new.example/?q="))
        );
        // legacy value stays, nothing is discarded
        assert_eq!(
            out.document.get("search_engine_url"),
            Some(&json!("https://old.example/?q="))
        );
    }

    #[test]
    fn test_defaults_fill_without_override() {
        let engine = MigrationEngine::new();

        let filled = engine.migrate_at(raw(json!({ "home_url": "h" })), None, fixed_now());
        assert_eq!(filled.document.get("sleep_mode_enabled"), Some(&json!(true)));
        assert_eq!(filled.document.get("sleep_mode_interval"), Some(&json!(300000)));
        assert_eq!(filled.document.get("splitter_sizes"), Some(&json!([800, 250])));
        assert_eq!(filled.document.get("last_session"), Some(&json!([])));

        let kept = engine.migrate_at(
            raw(json!({ "sleep_mode_enabled": false, "adblock_enabled": false })),
            None,
            fixed_now(),
        );
        assert_eq!(kept.document.get("sleep_mode_enabled"), Some(&json!(false)));
        assert_eq!(kept.document.get("adblock_enabled"), Some(&json!(false)));
    }

    #[test]
    fn test_version_stamped() {
        let engine = MigrationEngine::new();
        let out = engine.migrate_at(raw(json!({ "settings_version": "1.0" })), None, fixed_now());
        assert_eq!(out.document.get("settings_version"), Some(&json!("1.1")));

        let report = out.report.unwrap();
        assert_eq!(report.from, SchemaVersion::new(1, 0));
        assert_eq!(report.to, CURRENT_SCHEMA_VERSION);
        assert_eq!(report.applied, vec![SchemaVersion::new(1, 1)]);
        assert!(!report.seeded_defaults);
    }

    #[test]
    fn test_newer_document_passes_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"settings_version":"2.0"}"#).unwrap();

        let engine = MigrationEngine::new();
        let input = raw(json!({ "settings_version": "2.0", "future_key": 1 }));
        let out = engine.migrate_at(input.clone(), Some(&path), fixed_now());

        assert_eq!(out.status, MigrationStatus::Newer(SchemaVersion::new(2, 0)));
        assert_eq!(out.document, input);
        assert!(out.report.is_none());
        // no backup for a document we did not touch
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_document_seeds_first_run_values() {
        let engine = MigrationEngine::new();
        let out = engine.migrate_at(RawDocument::new(), None, fixed_now());

        let report = out.report.unwrap();
        assert!(report.seeded_defaults);
        assert_eq!(out.document.get("home_url"), Some(&json!(defaults::HOME_URL)));
        assert_eq!(
            out.document.get("blocked_sites"),
            Some(&json!(["twitter.com", "facebook.com", "tiktok.com"]))
        );
        assert_eq!(out.document.get("settings_version"), Some(&json!("1.1")));
    }

    #[test]
    fn test_backup_naming() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project_nowb_settings.json");
        fs::write(&path, r#"{"home_url":"h"}"#).unwrap();

        let engine = MigrationEngine::new();
        let out = engine.migrate_at(raw(json!({ "home_url": "h" })), Some(&path), fixed_now());
        let backup = out.report.unwrap().backup.unwrap();

        assert_eq!(
            backup.file_name().unwrap().to_str().unwrap(),
            "project_nowb_settings.json.bak_20240305140709"
        );
        assert_eq!(fs::read_to_string(&backup).unwrap(), r#"{"home_url":"h"}"#);
    }

    #[test]
    fn test_backup_never_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "new").unwrap();
        let existing = dir.path().join("settings.json.bak_20240305140709");
        fs::write(&existing, "old").unwrap();

        let backup = backup_file(&path, fixed_now()).unwrap().unwrap();
        assert_ne!(backup, existing);
        assert_eq!(fs::read_to_string(&existing).unwrap(), "old");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "new");
    }

    #[test]
    fn test_missing_source_skips_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let engine = MigrationEngine::new();
        let out = engine.migrate_at(RawDocument::new(), Some(&path), fixed_now());
        let report = out.report.unwrap();
        assert!(report.backup.is_none());
        assert!(report.backup_error.is_none());
    }

    #[test]
    fn test_backup_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        // a directory opens but cannot be read as a file
        let path = dir.path().join("settings.json");
        fs::create_dir(&path).unwrap();

        let engine = MigrationEngine::new();
        let out = engine.migrate_at(raw(json!({ "home_url": "h" })), Some(&path), fixed_now());
        let report = out.report.unwrap();

        assert!(report.backup.is_none());
        assert!(report.backup_error.is_some());
        assert_eq!(out.document.get("settings_version"), Some(&json!("1.1")));
    }

    #[test]
    fn test_registered_steps_run_in_order() {
        fn mark_a(doc: &mut RawDocument) {
            doc.insert("trail".into(), json!("a"));
        }
        fn mark_b(doc: &mut RawDocument) {
            let trail = doc.get("trail").and_then(Value::as_str).unwrap_or("").to_string();
            doc.insert("trail".into(), json!(format!("{}b", trail)));
        }

        let mut engine = MigrationEngine {
            current: SchemaVersion::new(1, 3),
            steps: Vec::new(),
        };
        engine.register(MigrationStep {
            target: SchemaVersion::new(1, 3),
            description: "b",
            apply: mark_b,
        });
        engine.register(MigrationStep {
            target: SchemaVersion::new(1, 2),
            description: "a",
            apply: mark_a,
        });

        let out = engine.migrate_at(raw(json!({ "settings_version": "1.1" })), None, fixed_now());
        assert_eq!(out.document.get("trail"), Some(&json!("ab")));
        assert_eq!(out.document.get("settings_version"), Some(&json!("1.3")));
    }

    #[test]
    fn test_report_summary() {
        let report = MigrationReport {
            from: SchemaVersion::new(1, 0),
            to: SchemaVersion::new(1, 1),
            applied: vec![SchemaVersion::new(1, 1)],
            seeded_defaults: false,
            backup: None,
            backup_error: Some("denied".into()),
        };
        let summary = report.summary();
        assert!(summary.contains("1.0"));
        assert!(summary.contains("backup failed: denied"));
    }
}
