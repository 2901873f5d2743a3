//! Application configuration
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! or missing file is valid.
//!
//! ```toml
//! app_name = "envport"
//! data_dir = "/home/me/.local/share/envport"
//! log_level = "debug"
//!
//! [save]
//! environments_debounce_ms = 2000
//! settings_debounce_ms = 1000
//! ```

use crate::bundle::Bundle;
use crate::error::{Error, Result};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name and version of the running application
///
/// Together they form the `source` of exported bundles; the version is
/// compared verbatim when importing routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub name: String,
    pub version: String,
}

impl AppIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `"<name>:<version>"`
    pub fn source(&self) -> String {
        Bundle::source_for(&self.name, &self.version)
    }
}

/// Debounce intervals of the persisted documents
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub environments_debounce_ms: u64,
    pub settings_debounce_ms: u64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            environments_debounce_ms: 2000,
            settings_debounce_ms: 1000,
        }
    }
}

impl SaveConfig {
    pub fn environments_debounce(&self) -> Duration {
        Duration::from_millis(self.environments_debounce_ms)
    }

    pub fn settings_debounce(&self) -> Duration {
        Duration::from_millis(self.settings_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,
    pub app_version: String,
    /// Directory of the JSON key/value store
    pub data_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
    pub save: SaveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "envport".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::from("envport-data"),
            log_level: "info".to_string(),
            save: SaveConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration file at `path`, or defaults if it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() || self.app_name.contains(':') {
            return Err(Error::Config(format!(
                "app_name '{}' must be non-empty and must not contain ':'",
                self.app_name
            )));
        }
        if self.app_version.is_empty() {
            return Err(Error::Config("app_version must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn identity(&self) -> AppIdentity {
        AppIdentity::new(&self.app_name, &self.app_version)
    }
}
