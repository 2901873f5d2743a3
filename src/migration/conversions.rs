//! Conversion of legacy exports into current bundles
//!
//! This is the only place where the legacy shape is recognised. Import code
//! calls [`into_current_bundle`] once on the parsed JSON and works with a
//! [`Bundle`] from then on.

use super::legacy_types::{LEGACY_EXPORT_ID, LegacyBundle, LegacySubject, legacy_last_migration};
use crate::bundle::{Bundle, BundleItem};
use serde_json::{Value, json};
use tracing::info;

/// Check whether parsed JSON is a legacy export
///
/// A legacy export carries the sentinel `id` and a non-empty `appVersion`.
pub fn is_legacy_bundle(value: &Value) -> bool {
    let has_sentinel = value.get("id").and_then(Value::as_str) == Some(LEGACY_EXPORT_ID);
    let has_version = value
        .get("appVersion")
        .and_then(Value::as_str)
        .is_some_and(|version| !version.is_empty());
    has_sentinel && has_version
}

/// Convert a legacy export into a current bundle
///
/// Environments are stamped with the last migration id shipped with the
/// exporting release so the pipeline only applies newer steps. For a release
/// missing from the index any `lastMigration` carried by the item is removed,
/// so every step runs. Routes are never migrated and are passed through as
/// they are. `app_name` only names the `source` of the resulting bundle.
pub fn convert_legacy_bundle(legacy: LegacyBundle, app_name: &str) -> Bundle {
    let last_migration = legacy_last_migration(&legacy.app_version);
    let stamp = |mut item: Value| {
        if let Some(object) = item.as_object_mut() {
            match last_migration {
                Some(id) => object.insert("lastMigration".to_string(), json!(id)),
                None => object.remove("lastMigration"),
            };
        }
        BundleItem::environment(item)
    };

    let data = match legacy.subject {
        LegacySubject::Environment => vec![stamp(legacy.data)],
        LegacySubject::Route => vec![BundleItem::route(legacy.data)],
        LegacySubject::Environments => match legacy.data {
            Value::Array(items) => items.into_iter().map(stamp).collect(),
            single => vec![stamp(single)],
        },
    };

    Bundle {
        source: Bundle::source_for(app_name, &legacy.app_version),
        data,
    }
}

/// Turn parsed import JSON into a current bundle, converting legacy exports
pub fn into_current_bundle(value: Value, app_name: &str) -> serde_json::Result<Bundle> {
    if is_legacy_bundle(&value) {
        let legacy: LegacyBundle = serde_json::from_value(value)?;
        info!(
            "Converting legacy export from version {} ({:?})",
            legacy.app_version, legacy.subject
        );
        return Ok(convert_legacy_bundle(legacy, app_name));
    }

    serde_json::from_value(value)
}
