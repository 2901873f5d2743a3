//! User settings document
//!
//! Persisted under its own storage key next to the environment list.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub welcome_shown: bool,
    /// Maximum body size kept in request logs, in bytes
    pub log_size_limit: u64,
    pub truncate_route_name: bool,
    pub environment_menu_size: u32,
    pub route_menu_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            welcome_shown: false,
            log_size_limit: 10000,
            truncate_route_name: true,
            environment_menu_size: 100,
            route_menu_size: 200,
        }
    }
}

impl Settings {
    /// Set one field by its JSON name from text
    ///
    /// `raw` is parsed as JSON first (`true`, `42`) and used as a plain
    /// string when that fails.
    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<()> {
        let mut document = serde_json::to_value(&*self).map_err(Error::Serialization)?;
        let Some(fields) = document.as_object_mut() else {
            return Err(Error::Config("settings are not a JSON object".to_string()));
        };
        if !fields.contains_key(name) {
            return Err(Error::Config(format!("unknown setting '{}'", name)));
        }

        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(name.to_string(), value);

        *self = serde_json::from_value(document)
            .map_err(|e| Error::Config(format!("invalid value for '{}': {}", name, e)))?;
        Ok(())
    }
}
