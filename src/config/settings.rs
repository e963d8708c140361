//! TOML-based configuration for cubeweave.
//!
//! Supports a config file (cubeweave.toml); every section is optional.
//!
//! Example configuration:
//! ```toml
//! [query]
//! use_dot_notation = false
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Member and alias formatting.
    pub query: QuerySettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Query formatting settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Keep members in `table.column` form (quoted) instead of `table__column`.
    pub use_dot_notation: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Options threaded through member formatting and join SQL generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// When true, aliases use dot notation: `"orders.customer_id"`.
    /// When false, they use underscore notation: `orders__customer_id`.
    pub use_dot_notation: bool,
}

impl QueryOptions {
    /// Options using dot notation.
    pub fn dot_notation() -> Self {
        Self {
            use_dot_notation: true,
        }
    }
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text and validate them.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CUBEWEAVE_CONFIG`
    /// 2. `./cubeweave.toml`
    ///
    /// Falls back to defaults when neither exists.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("CUBEWEAVE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cubeweave.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }

    /// Query options for compilation calls.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            use_dot_notation: self.query.use_dot_notation,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(SettingsError::InvalidConfig(format!(
                "unknown log level '{}', expected one of: {}",
                self.logging.level,
                LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}
