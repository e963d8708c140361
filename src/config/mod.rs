//! Configuration module for cubeweave.
//!
//! Handles the TOML settings file and the per-call query options derived
//! from it.

mod settings;

pub use settings::{LoggingSettings, QueryOptions, QuerySettings, Settings, SettingsError};
