//! Configuration module for Tally.
//!
//! Handles the `tally.toml` settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, EngineSettings, Settings, SettingsError, SqlSettings};
