//! NOWB Core Library
//!
//! This crate provides shared types, errors, and configuration for NOWB.

pub mod backup;
pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ProfileMode};
pub use error::{NowbError, NowbResult};
