//! Error types for NOWB

use thiserror::Error;

/// Result type alias for NOWB operations
pub type NowbResult<T> = Result<T, NowbError>;

/// Main error type for NOWB
#[derive(Error, Debug)]
pub enum NowbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("History error: {0}")]
    History(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Tab error: {0}")]
    Tab(String),

    #[error("Ad blocking error: {0}")]
    AdBlock(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NowbError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create a new migration error
    pub fn migration(msg: impl Into<String>) -> Self {
        Self::Migration(msg.into())
    }

    /// Create a new history error
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }

    /// Create a new session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a new tab error
    pub fn tab(msg: impl Into<String>) -> Self {
        Self::Tab(msg.into())
    }

    /// Create a new ad blocking error
    pub fn adblock(msg: impl Into<String>) -> Self {
        Self::AdBlock(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
