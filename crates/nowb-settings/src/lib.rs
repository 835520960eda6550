//! Versioned settings document for NOWB
//!
//! Loading goes through three stages: [`ConfigStore`] reads the raw JSON
//! object, [`MigrationEngine`] brings it up to [`CURRENT_SCHEMA_VERSION`],
//! and [`SettingsDocument::from_raw`] turns it into the typed schema that
//! the rest of the browser reads through accessors.

pub mod document;
pub mod migration;
pub mod store;
pub mod version;

pub use document::{defaults, keys, RawDocument, SettingsDocument};
pub use migration::{
    MigrationEngine, MigrationOutcome, MigrationReport, MigrationStatus, MigrationStep,
};
pub use store::{ConfigStore, LoadOutcome, LoadedSettings, StoreWarning};
pub use version::{SchemaVersion, CURRENT_SCHEMA_VERSION};
