//! Bundle format
//!
//! A bundle is the portable representation of environments and routes:
//!
//! ```json
//! {
//!     "source": "envport:0.7.0",
//!     "data": [
//!         { "type": "environment", "item": { ... } },
//!         { "type": "route", "item": { ... } }
//!     ]
//! }
//! ```
//!
//! Files are UTF-8 JSON indented with four spaces. Items are kept as raw JSON
//! so environments in older shapes reach the migration pipeline intact.

use crate::environment::{Environment, Route};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

/// Kind of a bundle entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Environment,
    Route,
    /// Entry types from other versions, skipped on import
    #[serde(other)]
    Unknown,
}

/// One entry of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub item: Value,
}

impl BundleItem {
    pub fn environment(item: Value) -> Self {
        Self {
            kind: ItemKind::Environment,
            item,
        }
    }

    pub fn route(item: Value) -> Self {
        Self {
            kind: ItemKind::Route,
            item,
        }
    }
}

/// A set of environments and routes exchanged between installations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// `"<app-name>:<version>"` of the exporting application
    pub source: String,
    pub data: Vec<BundleItem>,
}

impl Bundle {
    /// Build the `source` string for an application name and version
    pub fn source_for(app_name: &str, app_version: &str) -> String {
        format!("{}:{}", app_name, app_version)
    }

    /// Bundle a list of environments
    pub fn from_environments(source: String, environments: &[Environment]) -> Result<Self> {
        let data = environments
            .iter()
            .map(|environment| {
                serde_json::to_value(environment)
                    .map(BundleItem::environment)
                    .map_err(Error::Serialization)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { source, data })
    }

    /// Bundle a single route
    pub fn from_route(source: String, route: &Route) -> Result<Self> {
        let item = serde_json::to_value(route).map_err(Error::Serialization)?;
        Ok(Self {
            source,
            data: vec![BundleItem::route(item)],
        })
    }

    /// Version part of `source`, compared verbatim with the running version
    ///
    /// Returns an empty string when `source` has no `:` separator.
    pub fn source_version(&self) -> &str {
        self.source.split(':').nth(1).unwrap_or_default()
    }

    /// Serialize to the canonical four-space indented JSON text
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(Error::Serialization)?;
        // serde_json only ever writes valid UTF-8
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_version() {
        let bundle = Bundle {
            source: "envport:1.2.3".to_string(),
            data: vec![],
        };
        assert_eq!(bundle.source_version(), "1.2.3");

        let bundle = Bundle {
            source: "garbage".to_string(),
            data: vec![],
        };
        assert_eq!(bundle.source_version(), "");
    }

    #[test]
    fn test_pretty_json_uses_four_spaces() {
        let bundle = Bundle {
            source: "envport:1.0.0".to_string(),
            data: vec![BundleItem::route(json!({ "uuid": "r" }))],
        };

        let text = bundle.to_json_pretty().unwrap();
        let expected = "{\n    \"source\": \"envport:1.0.0\",\n    \"data\": [\n        {\n            \"type\": \"route\",\n            \"item\": {\n                \"uuid\": \"r\"\n            }\n        }\n    ]\n}";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_unknown_item_kind_is_tolerated() {
        let bundle: Bundle = serde_json::from_value(json!({
            "source": "envport:1.0.0",
            "data": [{ "type": "folder", "item": {} }]
        }))
        .unwrap();
        assert_eq!(bundle.data[0].kind, ItemKind::Unknown);
    }
}
