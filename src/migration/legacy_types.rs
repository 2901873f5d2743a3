//! Legacy export format
//!
//! Before bundles existed, exports were a single object tagged with a
//! sentinel `id` ([`LEGACY_EXPORT_ID`]), the exporting `appVersion`, a `subject`
//! and the raw payload. These files are still accepted on import.

use serde::Deserialize;
use serde_json::Value;

/// Last migration id shipped with each release that produced legacy exports
///
/// Environments in legacy exports predate the `lastMigration` field, so the
/// release version is the only way to know which steps they already carry.
pub const LEGACY_MIGRATION_INDEX: &[(&str, u32)] =
    &[("1.4.0", 5), ("1.5.0", 6), ("1.5.1", 7), ("1.6.0", 8)];

/// Look up the last migration id shipped with `app_version`
pub fn legacy_last_migration(app_version: &str) -> Option<u32> {
    LEGACY_MIGRATION_INDEX
        .iter()
        .find(|(version, _)| *version == app_version)
        .map(|(_, id)| *id)
}

/// Sentinel `id` carried by every legacy export
///
/// The legacy format is frozen, so this does not follow the configured
/// application name.
pub const LEGACY_EXPORT_ID: &str = "envport_export";

/// What a legacy export contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacySubject {
    /// A single environment object
    Environment,
    /// A single route object
    Route,
    /// A list of environments (any unrecognised subject is read this way)
    #[serde(other)]
    Environments,
}

/// A legacy single-item export
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBundle {
    /// Sentinel identifier, [`LEGACY_EXPORT_ID`]
    pub id: String,
    /// Version of the exporting application
    pub app_version: String,
    pub subject: LegacySubject,
    /// Environment, route, or list of environments
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_last_migration() {
        assert_eq!(legacy_last_migration("1.4.0"), Some(5));
        assert_eq!(legacy_last_migration("1.5.0"), Some(6));
        assert_eq!(legacy_last_migration("1.6.0"), Some(8));
        assert_eq!(legacy_last_migration("1.6"), None);
    }

    #[test]
    fn test_unknown_subject_reads_as_environments() {
        let legacy: LegacyBundle = serde_json::from_value(json!({
            "id": "envport_export",
            "appVersion": "1.5.1",
            "subject": "full",
            "data": []
        }))
        .unwrap();
        assert_eq!(legacy.subject, LegacySubject::Environments);
    }
}
