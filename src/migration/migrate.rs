//! Migration steps for environment documents
//!
//! Each step upgrades one aspect of the environment schema. Steps are listed
//! in `MIGRATIONS` in id order; the pipeline applies those above the
//! document's `lastMigration` and stamps the id of every step it applies.

use super::normalize::{Object, for_each_response, responses_mut, routes_mut, set_default};
use crate::environment::{Environment, generate_uuid};
use crate::error::{Error, Result};
use serde_json::{Value, json};
use tracing::{debug, error};

/// One schema upgrade step
pub struct Migration {
    pub id: u32,
    pub description: &'static str,
    pub apply: fn(&mut Object),
}

/// Every migration step, in the order they are applied
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "fold route-level response fields into a responses list",
        apply: fold_route_level_response,
    },
    Migration {
        id: 2,
        description: "give every route response an identifier",
        apply: add_response_uuids,
    },
    Migration {
        id: 3,
        description: "add response rules",
        apply: add_response_rules,
    },
    Migration {
        id: 4,
        description: "add proxy mode",
        apply: add_proxy_mode,
    },
    Migration {
        id: 5,
        description: "add templating switch to route responses",
        apply: add_disable_templating,
    },
    Migration {
        id: 6,
        description: "add rules operator to route responses",
        apply: add_rules_operator,
    },
    Migration {
        id: 7,
        description: "add random response flag to routes",
        apply: add_random_response,
    },
    Migration {
        id: 8,
        description: "add listening hostname",
        apply: add_hostname,
    },
    Migration {
        id: 9,
        description: "add proxy request and response headers",
        apply: add_proxy_headers,
    },
    Migration {
        id: 10,
        description: "add sequential responses and response labels",
        apply: add_sequential_response_and_labels,
    },
    Migration {
        id: 11,
        description: "rename response file to filePath and add file-as-body flag",
        apply: rename_response_file,
    },
];

/// Id of the most recent migration step
pub const HIGHEST_MIGRATION_ID: u32 = 11;

/// Read the `lastMigration` stamp of a document, treating absence as 0
pub fn last_migration_of(document: &Object) -> u32 {
    document
        .get("lastMigration")
        .and_then(Value::as_u64)
        .map(|id| u32::try_from(id).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Bring one environment document to the current schema
///
/// # Arguments
/// * `document` - Raw environment JSON in any historical shape
///
/// # Returns
/// The typed environment, or `Error::Migration` if the document is not an
/// object or does not fit the current schema after migration
pub fn migrate_environment(mut document: Value) -> Result<Environment> {
    let uuid = document
        .get("uuid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let Some(object) = document.as_object_mut() else {
        return Err(Error::Migration {
            uuid,
            reason: "document is not a JSON object".to_string(),
        });
    };

    let last_migration = last_migration_of(object);
    for migration in MIGRATIONS.iter().filter(|m| m.id > last_migration) {
        debug!(
            "Applying migration {} to environment {}: {}",
            migration.id, uuid, migration.description
        );
        (migration.apply)(object);
        object.insert("lastMigration".to_string(), json!(migration.id));
    }

    serde_json::from_value(document).map_err(|e| Error::Migration {
        uuid,
        reason: e.to_string(),
    })
}

/// Migrate a list of stored environments, dropping those that fail
pub fn migrate_environments(documents: Vec<Value>) -> Vec<Environment> {
    documents
        .into_iter()
        .filter_map(|document| match migrate_environment(document) {
            Ok(environment) => Some(environment),
            Err(e) => {
                error!("{}", e);
                None
            }
        })
        .collect()
}

fn fold_route_level_response(environment: &mut Object) {
    const LEGACY_FIELDS: [&str; 5] = ["statusCode", "body", "latency", "headers", "file"];

    for route in routes_mut(environment) {
        if route.contains_key("responses") {
            continue;
        }

        let mut response = Object::new();
        for field in LEGACY_FIELDS {
            if let Some(value) = route.remove(field) {
                response.insert(field.to_string(), value);
            }
        }
        route.insert("responses".to_string(), Value::Array(vec![Value::Object(response)]));
    }
}

fn add_response_uuids(environment: &mut Object) {
    for_each_response(environment, |response| {
        let missing = response
            .get("uuid")
            .and_then(Value::as_str)
            .is_none_or(str::is_empty);
        if missing {
            response.insert("uuid".to_string(), json!(generate_uuid()));
        }
    });
}

fn add_response_rules(environment: &mut Object) {
    for_each_response(environment, |response| {
        set_default(response, "rules", json!([]));
    });
}

fn add_proxy_mode(environment: &mut Object) {
    set_default(environment, "proxyMode", json!(false));
    set_default(environment, "proxyHost", json!(""));
}

fn add_disable_templating(environment: &mut Object) {
    for_each_response(environment, |response| {
        set_default(response, "disableTemplating", json!(false));
    });
}

fn add_rules_operator(environment: &mut Object) {
    for_each_response(environment, |response| {
        set_default(response, "rulesOperator", json!("OR"));
    });
}

fn add_random_response(environment: &mut Object) {
    for route in routes_mut(environment) {
        set_default(route, "randomResponse", json!(false));
    }
}

fn add_hostname(environment: &mut Object) {
    set_default(environment, "hostname", json!("0.0.0.0"));
}

fn add_proxy_headers(environment: &mut Object) {
    set_default(environment, "proxyReqHeaders", json!([]));
    set_default(environment, "proxyResHeaders", json!([]));
}

fn add_sequential_response_and_labels(environment: &mut Object) {
    for route in routes_mut(environment) {
        set_default(route, "sequentialResponse", json!(false));
        for response in responses_mut(route) {
            set_default(response, "label", json!(""));
        }
    }
}

fn rename_response_file(environment: &mut Object) {
    for_each_response(environment, |response| {
        if let Some(file) = response.remove("file") {
            set_default(response, "filePath", file);
        }
        set_default(response, "sendFileAsBody", json!(false));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Method, RulesOperator};

    #[test]
    fn test_migration_ids_are_sequential() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.id as usize, index + 1);
        }
        assert_eq!(MIGRATIONS.last().unwrap().id, HIGHEST_MIGRATION_ID);
    }

    #[test]
    fn test_migrate_oldest_shape() {
        let document = json!({
            "uuid": "legacy-env",
            "name": "Legacy",
            "port": 3000,
            "routes": [{
                "uuid": "legacy-route",
                "method": "get",
                "endpoint": "answer",
                "statusCode": 418,
                "body": "{}",
                "file": "/tmp/answer.json",
                "headers": [{ "key": "X-Test", "value": "1" }]
            }]
        });

        let environment = migrate_environment(document).unwrap();
        assert_eq!(environment.last_migration, HIGHEST_MIGRATION_ID);
        assert_eq!(environment.hostname, "0.0.0.0");

        let route = &environment.routes[0];
        assert_eq!(route.method, Method::get);
        assert_eq!(route.responses.len(), 1);

        let response = &route.responses[0];
        assert!(!response.uuid.is_empty());
        assert_eq!(response.status_code, 418);
        assert_eq!(response.file_path, "/tmp/answer.json");
        assert_eq!(response.headers[0].key, "X-Test");
        assert_eq!(response.rules_operator, RulesOperator::Or);
        assert!(!response.extra.contains_key("file"));
    }

    #[test]
    fn test_migration_skips_applied_steps() {
        // Step 1 must not run: the route has no responses list on purpose.
        let document = json!({
            "uuid": "e",
            "lastMigration": 6,
            "routes": [{ "uuid": "r", "statusCode": 500 }]
        });

        let environment = migrate_environment(document).unwrap();
        assert!(environment.routes[0].responses.is_empty());
        assert_eq!(environment.routes[0].extra.get("statusCode"), Some(&json!(500)));
        assert_eq!(environment.last_migration, HIGHEST_MIGRATION_ID);
    }

    #[test]
    fn test_current_document_is_untouched() {
        let document = json!({
            "uuid": "e",
            "lastMigration": HIGHEST_MIGRATION_ID,
            "proxyHost": "http://upstream",
            "routes": []
        });

        let environment = migrate_environment(document).unwrap();
        assert_eq!(environment.proxy_host, "http://upstream");
        assert_eq!(environment.last_migration, HIGHEST_MIGRATION_ID);
    }

    #[test]
    fn test_migrate_rejects_non_object() {
        let err = migrate_environment(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
    }

    #[test]
    fn test_migrate_environments_drops_invalid_documents() {
        let documents = vec![
            json!({ "uuid": "ok", "port": 3000 }),
            json!({ "uuid": "bad", "port": "not a port" }),
        ];

        let environments = migrate_environments(documents);
        assert_eq!(environments.len(), 1);
        assert_eq!(environments[0].uuid, "ok");
    }
}
