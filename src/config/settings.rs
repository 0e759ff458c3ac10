//! TOML-based configuration for Tally.
//!
//! Supports a config file (tally.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! max_result_rows = 100000   # 0 disables the limit
//! alias_prefix = "m_"
//! count_alias = "row_count"
//!
//! [sql]
//! dialect = "${TALLY_DIALECT}"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sql::dialect::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Multi-count engine settings.
    pub engine: EngineSettings,

    /// SQL rendering settings.
    pub sql: SqlSettings,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum distinct rows a grouped scan may return (0 = unlimited).
    pub max_result_rows: usize,

    /// Prefix of positional measure aliases.
    pub alias_prefix: String,

    /// Alias of the per-combination row count.
    pub count_alias: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_result_rows: 65_536,
            alias_prefix: "measure_".to_string(),
            count_alias: "row_count".to_string(),
        }
    }
}

impl EngineSettings {
    /// The cardinality limit, or `None` when disabled.
    pub fn result_limit(&self) -> Option<usize> {
        (self.max_result_rows > 0).then_some(self.max_result_rows)
    }
}

/// SQL rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlSettings {
    /// Dialect name (duckdb, postgres, tsql, mysql).
    pub dialect: String,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            dialect: "duckdb".to_string(),
        }
    }
}

impl SqlSettings {
    /// Get the dialect type.
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        Dialect::from_name(self.dialect.trim())
            .ok_or_else(|| SettingsError::UnsupportedDialect(self.dialect.clone()))
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text, expanding environment variables and
    /// validating the result.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.engine.alias_prefix = expand_env_vars(&settings.engine.alias_prefix)?;
        settings.engine.count_alias = expand_env_vars(&settings.engine.count_alias)?;
        settings.sql.dialect = expand_env_vars(&settings.sql.dialect)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `TALLY_CONFIG`
    /// 2. `./tally.toml`
    /// 3. `~/.config/tally/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("TALLY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("tally.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tally").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check the alias scheme and dialect.
    ///
    /// The count alias must not be reachable from the measure alias scheme,
    /// so it may not start with the alias prefix.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let engine = &self.engine;
        if engine.alias_prefix.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "engine.alias_prefix must not be empty".into(),
            ));
        }
        if engine.count_alias.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "engine.count_alias must not be empty".into(),
            ));
        }
        if engine.count_alias.starts_with(&engine.alias_prefix) {
            return Err(SettingsError::InvalidConfig(format!(
                "engine.count_alias {:?} collides with alias prefix {:?}",
                engine.count_alias, engine.alias_prefix
            )));
        }
        self.sql.dialect()?;
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Lone $
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
